use crate::Args;
use anyhow::Result;
use gigboard::activity::ActivityLog;
use gigboard::catalog::Catalog;
use gigboard::config::Config;
use gigboard::error::GigError;
use gigboard::filter::{DeliveryBucket, FilterCriteria, PriceBucket};
use gigboard::forms::{ApplicationForm, CategoryForm, JobForm, RegisterForm};
use gigboard::models::{JobPosting, ProfilePatch, Role, UserProfile};
use gigboard::session::{SessionProvider, SessionState};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::cell::RefCell;
use std::path::PathBuf;

pub struct Context {
    pub args: Args,
    pub root: PathBuf,
    pub config: RefCell<Config>,
    pub catalog: RefCell<Catalog>,
    pub session: RefCell<Box<dyn SessionProvider>>,
    pub activity: RefCell<ActivityLog>,
    pub criteria: RefCell<FilterCriteria>,
}

impl Context {
    fn verbose(&self) -> bool {
        self.args.verbose || self.args.debug
    }

    fn role(&self) -> Option<Role> {
        self.session.borrow().state().role()
    }

    fn profile(&self) -> Option<UserProfile> {
        self.session.borrow().current().cloned()
    }

    /// Append to the activity log; a failed write is only a warning
    fn record(&self, f: impl FnOnce(&mut ActivityLog) -> Result<()>) {
        if let Err(e) = f(&mut self.activity.borrow_mut()) {
            eprintln!("Warning: failed to write activity log: {}", e);
        }
    }
}

/// Run each command in order, stopping at `/exit`
pub fn run_once(ctx: &Context, commands: &[String]) -> Result<()> {
    for command in commands {
        if handle_command(ctx, command.trim()) {
            break;
        }
    }
    Ok(())
}

pub fn run_repl(ctx: Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let history = ctx.root.join(".gigboard").join("history");
    let _ = rl.load_history(&history);

    println!("gigboard - type /help for commands, /exit to quit");
    print_jobs(&ctx, &ctx.catalog.borrow().featured().iter().collect::<Vec<_>>());

    loop {
        let prompt = match ctx.role() {
            Some(role) => format!("gigboard[{}]> ", role),
            None => "gigboard> ".to_string(),
        };
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                // Credentials stay out of the history file
                if !is_credential_command(line) {
                    rl.add_history_entry(line)?;
                }

                if line.starts_with('/') {
                    if handle_command(&ctx, line) {
                        break;
                    }
                    continue;
                }

                // Bare text is a search
                ctx.criteria.borrow_mut().query = line.to_string();
                list_jobs(&ctx);
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    if let Some(parent) = history.parent() {
        if std::fs::create_dir_all(parent).is_ok() {
            let _ = rl.save_history(&history);
        }
    }
    Ok(())
}

fn is_credential_command(line: &str) -> bool {
    line.starts_with("/login") || line.starts_with("/register")
}

fn report(err: &GigError) {
    let messages = err.messages();
    if messages.len() == 1 {
        eprintln!("Error: {}", messages[0]);
    } else {
        eprintln!("Error:");
        for m in messages {
            eprintln!("  - {}", m);
        }
    }
}

fn parse_id(arg: Option<&String>, what: &str) -> Option<u32> {
    match arg.map(|s| s.parse::<u32>()) {
        Some(Ok(id)) => Some(id),
        _ => {
            println!("Usage: {} <id>", what);
            None
        }
    }
}

/// Split `key=value` arguments; anything without `=` is returned as a positional
fn split_assignments(args: &[String]) -> (Vec<(String, String)>, Vec<String>) {
    let mut pairs = Vec::new();
    let mut rest = Vec::new();
    for arg in args {
        match arg.split_once('=') {
            Some((k, v)) => pairs.push((k.trim().to_string(), v.trim().to_string())),
            None => rest.push(arg.clone()),
        }
    }
    (pairs, rest)
}

fn handle_command(ctx: &Context, line: &str) -> bool {
    let words = match shell_words::split(line) {
        Ok(words) => words,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            return false;
        }
    };
    let Some((cmd, args)) = words.split_first() else {
        return false;
    };

    if ctx.verbose() {
        if is_credential_command(line) {
            eprintln!("[VERBOSE] command: {}", cmd);
        } else {
            eprintln!("[VERBOSE] command: {}", line);
        }
    }

    match cmd.as_str() {
        "/exit" | "/quit" => return true,
        "/help" => print_help(),
        "/jobs" => {
            if !args.is_empty() {
                ctx.criteria.borrow_mut().query = args.join(" ");
            }
            list_jobs(ctx);
        }
        "/featured" => {
            let catalog = ctx.catalog.borrow();
            print_jobs(ctx, &catalog.featured().iter().collect::<Vec<_>>());
        }
        "/job" => {
            if let Some(id) = parse_id(args.first(), "/job") {
                show_job(ctx, id);
            }
        }
        "/related" => {
            if let Some(id) = parse_id(args.first(), "/related") {
                let catalog = ctx.catalog.borrow();
                match catalog.job(id) {
                    Ok(job) => print_jobs(ctx, &catalog.related_jobs(job)),
                    Err(e) => report(&e),
                }
            }
        }
        "/filter" => cmd_filter(ctx, args),
        "/clear" => {
            ctx.criteria.borrow_mut().clear();
            println!("Filters cleared");
            list_jobs(ctx);
        }
        "/categories" => {
            for c in ctx.catalog.borrow().categories() {
                println!("  {:>3}  {} {}  - {}", c.id, c.icon, c.name, c.description);
            }
        }
        "/category" => cmd_category(ctx, args),
        "/post" => cmd_post(ctx, args),
        "/myjobs" => match ctx.profile() {
            Some(profile) => {
                let catalog = ctx.catalog.borrow();
                let mine = catalog.jobs_posted_by(&profile.email);
                if mine.is_empty() {
                    println!("You have not posted any jobs");
                } else {
                    print_jobs(ctx, &mine);
                }
            }
            None => println!("Log in to see your jobs"),
        },
        "/rmjob" => {
            if let Some(id) = parse_id(args.first(), "/rmjob") {
                cmd_remove_job(ctx, id);
            }
        }
        "/apply" => cmd_apply(ctx, args),
        "/users" => cmd_users(ctx, args),
        "/block" => {
            if let Some(id) = parse_id(args.first(), "/block") {
                let result = ctx.catalog.borrow_mut().toggle_user_status(id, ctx.role());
                match result {
                    Ok(status) => {
                        println!("User {} is now {}", id, status.as_str());
                        ctx.record(|log| log.user_status(id, status.as_str()));
                    }
                    Err(e) => report(&e),
                }
            }
        }
        "/rmuser" => {
            if let Some(id) = parse_id(args.first(), "/rmuser") {
                let result = ctx.catalog.borrow_mut().delete_user(id, ctx.role());
                match result {
                    Ok(user) => {
                        println!("Removed user {} ({})", user.name, user.email);
                        ctx.record(|log| log.user_removed(id));
                    }
                    Err(e) => report(&e),
                }
            }
        }
        "/dashboard" => cmd_dashboard(ctx),
        "/register" => cmd_register(ctx, args),
        "/login" => cmd_login(ctx, args),
        "/logout" => {
            let email = ctx.profile().map(|p| p.email);
            let result = ctx.session.borrow_mut().logout();
            match result {
                Ok(()) => {
                    println!("Logged out");
                    ctx.record(|log| log.logout(email.as_deref()));
                }
                Err(e) => report(&e),
            }
        }
        "/whoami" => {
            let session = ctx.session.borrow();
            match session.state() {
                SessionState::Anonymous => println!("Not logged in ({} provider)", session.kind()),
                SessionState::Authenticated { role, profile } => println!(
                    "{} <{}> - {} ({} provider)",
                    profile.name,
                    profile.email,
                    role,
                    session.kind()
                ),
            }
        }
        "/profile" => cmd_profile(ctx, args),
        "/status" => {
            let config = ctx.config.borrow();
            println!("Provider: {}", config.auth.provider.as_str());
            println!("Data dir: {}", config.data_dir(&ctx.root).display());
            println!("Activity log: {}", ctx.activity.borrow().path.display());
            println!("Run: {}", ctx.activity.borrow().run_id());
            println!("Filters: {}", ctx.criteria.borrow().describe());
        }
        other => println!("Unknown command: {}. Type /help", other),
    }
    false
}

fn print_help() {
    println!("Jobs:");
    println!("  /jobs [text]              - list jobs matching the current filters");
    println!("  /featured                 - first jobs on the home page");
    println!("  /job <id>                 - show a job and related jobs");
    println!("  /related <id>             - jobs in the same category");
    println!("  /filter key=value ...     - query, category, price, delivery (value 'any' clears)");
    println!("      price:    {}", PriceBucket::ALL.map(|b| b.as_str()).join(", "));
    println!("      delivery: {}", DeliveryBucket::ALL.map(|b| b.as_str()).join(", "));
    println!("  /clear                    - clear all filters");
    println!("  /post key=value ...       - title, budget, delivery, category, description");
    println!("  /myjobs                   - jobs you posted");
    println!("  /rmjob <id>               - remove a job");
    println!("  /apply <id> key=value ... - fullName, email, phone, country, resume, deliveryTime, budget, ...");
    println!("Categories:");
    println!("  /categories               - list categories");
    println!("  /category add <name> <icon> <description>");
    println!("  /category rm <id>");
    println!("Admin:");
    println!("  /users [text] [role=...]  - search users");
    println!("  /block <id>               - block or unblock a user");
    println!("  /rmuser <id>              - remove a user");
    println!("  /dashboard                - counts and recent activity");
    println!("Account:");
    println!("  /register <name> <email> <password> [confirm]");
    println!("  /login <email> <password>");
    println!("  /logout");
    println!("  /whoami");
    println!("  /profile [set key=value ...]");
    println!("  /status                   - provider, data dir and activity log");
    println!("  /help, /exit");
}

fn print_jobs(ctx: &Context, jobs: &[&JobPosting]) {
    if jobs.is_empty() {
        println!("No jobs found");
        return;
    }
    for job in jobs {
        println!(
            "  #{:<3} {}  [{}]  {}  {}",
            job.id, job.title, job.category, job.budget, job.delivery_time
        );
        if ctx.verbose() {
            println!("        {}", job.summary());
        }
    }
}

fn list_jobs(ctx: &Context) {
    let criteria = ctx.criteria.borrow();
    let catalog = ctx.catalog.borrow();
    let jobs = catalog.search(&criteria);
    if criteria.is_active() {
        println!(
            "{} of {} jobs ({}; /clear to reset)",
            jobs.len(),
            catalog.jobs().len(),
            criteria.describe()
        );
    } else {
        println!("{} jobs", jobs.len());
    }
    print_jobs(ctx, &jobs);
}

fn show_job(ctx: &Context, id: u32) {
    let catalog = ctx.catalog.borrow();
    let job = match catalog.job(id) {
        Ok(job) => job,
        Err(e) => return report(&e),
    };
    println!("#{} {}", job.id, job.title);
    println!("  Category: {}", job.category);
    println!("  Budget:   {}", job.budget);
    println!("  Delivery: {}", job.delivery_time);
    println!("  Posted:   {} by {}", job.posted_date, job.posted_by);
    println!();
    println!("{}", job.description);

    let related = catalog.related_jobs(job);
    if !related.is_empty() {
        println!();
        println!("Related jobs:");
        print_jobs(ctx, &related);
    }
}

fn cmd_filter(ctx: &Context, args: &[String]) {
    let (pairs, rest) = split_assignments(args);
    if !rest.is_empty() {
        println!("Usage: /filter key=value ... (query, category, price, delivery)");
        return;
    }

    let mut criteria = ctx.criteria.borrow().clone();
    for (key, value) in pairs {
        let unset = value.is_empty() || value == "any" || value == "all";
        match key.as_str() {
            "query" | "q" => criteria.query = value,
            "category" => criteria.category = if unset { None } else { Some(value) },
            "price" | "budget" => {
                if unset {
                    criteria.price = None;
                } else if let Some(bucket) = PriceBucket::from_str(&value) {
                    criteria.price = Some(bucket);
                } else {
                    println!("Unknown price range: {}", value);
                    return;
                }
            }
            "delivery" => {
                if unset {
                    criteria.delivery = None;
                } else if let Some(bucket) = DeliveryBucket::from_str(&value) {
                    criteria.delivery = Some(bucket);
                } else {
                    println!("Unknown delivery range: {}", value);
                    return;
                }
            }
            other => {
                println!("Unknown filter: {}", other);
                return;
            }
        }
    }
    *ctx.criteria.borrow_mut() = criteria;
    list_jobs(ctx);
}

fn cmd_category(ctx: &Context, args: &[String]) {
    match args.first().map(String::as_str) {
        Some("add") if args.len() >= 4 => {
            let form = CategoryForm {
                name: args[1].clone(),
                icon: args[2].clone(),
                description: args[3..].join(" "),
            };
            let result = ctx
                .catalog
                .borrow_mut()
                .add_category(&form, ctx.role())
                .map(|c| (c.id, c.name.clone()));
            match result {
                Ok((id, name)) => {
                    println!("Added category #{} {}", id, name);
                    ctx.record(|log| log.category_added(id, &name));
                }
                Err(e) => report(&e),
            }
        }
        Some("rm") => {
            if let Some(id) = parse_id(args.get(1), "/category rm") {
                let result = ctx.catalog.borrow_mut().remove_category(id, ctx.role());
                match result {
                    Ok(c) => {
                        println!("Removed category {}", c.name);
                        ctx.record(|log| log.category_removed(c.id, &c.name));
                    }
                    Err(e) => report(&e),
                }
            }
        }
        _ => println!("Usage: /category add <name> <icon> <description> | /category rm <id>"),
    }
}

fn cmd_post(ctx: &Context, args: &[String]) {
    let Some(profile) = ctx.profile() else {
        println!("Log in to post a job");
        return;
    };
    let (pairs, _) = split_assignments(args);
    let mut form = JobForm::default();
    for (key, value) in pairs {
        match key.as_str() {
            "title" => form.title = value,
            "budget" => form.budget = value,
            "delivery" | "deliveryTime" => form.delivery_time = value,
            "category" => form.category = value,
            "description" => form.description = value,
            other => {
                println!("Unknown job field: {}", other);
                return;
            }
        }
    }

    let result = ctx
        .catalog
        .borrow_mut()
        .add_job(&form, &profile)
        .map(|j| (j.id, j.title.clone()));
    match result {
        Ok((id, title)) => {
            println!("Posted job #{} {}", id, title);
            ctx.record(|log| log.job_posted(id, &title, &profile.email));
        }
        Err(e) => report(&e),
    }
}

fn cmd_remove_job(ctx: &Context, id: u32) {
    let Some(profile) = ctx.profile() else {
        println!("Log in to remove a job");
        return;
    };
    let result = ctx.catalog.borrow_mut().delete_job(id, &profile);
    match result {
        Ok(job) => {
            println!("Removed job #{} {}", job.id, job.title);
            ctx.record(|log| log.job_removed(id, &profile.email));
        }
        Err(e) => report(&e),
    }
}

fn cmd_apply(ctx: &Context, args: &[String]) {
    let Some(id) = parse_id(args.first(), "/apply") else {
        return;
    };
    let (pairs, _) = split_assignments(&args[1..]);

    let mut form = ApplicationForm::default();
    if let Some(profile) = ctx.profile() {
        form.full_name = profile.name;
        form.email = profile.email;
        form.phone = profile.phone;
        form.country = profile.location;
    }
    for (key, value) in pairs {
        match key.as_str() {
            "fullName" | "name" => form.full_name = value,
            "email" => form.email = value,
            "phone" => form.phone = value,
            "country" => form.country = value,
            "languages" => form.languages = value,
            "experience" => form.experience = value,
            "skills" => form.skills = value,
            "portfolio" => form.portfolio = value,
            "resume" => form.resume = value,
            "coverLetter" => form.cover_letter = value,
            "deliveryTime" | "delivery" => form.delivery_time = value,
            "budget" => form.budget = value,
            other => {
                println!("Unknown application field: {}", other);
                return;
            }
        }
    }

    match ctx.catalog.borrow().apply(id, ctx.role(), &form) {
        Ok(receipt) => {
            println!(
                "Application for #{} {} submitted as {}",
                receipt.job_id, receipt.job_title, receipt.applicant
            );
            ctx.record(|log| log.application(receipt.job_id, &receipt.email));
        }
        Err(e) => report(&e),
    }
}

fn cmd_users(ctx: &Context, args: &[String]) {
    if ctx.role() != Some(Role::Admin) {
        report(&GigError::Forbidden("only admins can view users".to_string()));
        return;
    }
    let (pairs, rest) = split_assignments(args);
    let mut role = None;
    for (key, value) in pairs {
        if key != "role" {
            println!("Unknown user filter: {}", key);
            return;
        }
        match Role::from_str(&value) {
            Some(r) => role = Some(r),
            None => {
                println!("Unknown role: {}", value);
                return;
            }
        }
    }

    let catalog = ctx.catalog.borrow();
    let users = catalog.filter_users(&rest.join(" "), role);
    if users.is_empty() {
        println!("No users found");
    }
    for u in users {
        println!(
            "  {:>3}  {:<20} {:<28} {:<13} {:<8} {}",
            u.id,
            u.name,
            u.email,
            u.role.as_str(),
            u.status.as_str(),
            u.join_date
        );
    }
}

fn cmd_dashboard(ctx: &Context) {
    let dashboard = match ctx.catalog.borrow().dashboard(ctx.role()) {
        Ok(d) => d,
        Err(e) => return report(&e),
    };
    println!("Jobs:       {}", dashboard.total_jobs);
    println!(
        "Users:      {} ({} blocked)",
        dashboard.total_users, dashboard.blocked_users
    );
    println!("Categories: {}", dashboard.total_categories);
    println!();
    println!("Recent jobs:");
    print_jobs(ctx, &dashboard.recent_jobs.iter().collect::<Vec<_>>());
    println!("Recent users:");
    for u in &dashboard.recent_users {
        println!("  {:>3}  {} <{}> {}", u.id, u.name, u.email, u.role);
    }
}

fn cmd_register(ctx: &Context, args: &[String]) {
    if args.len() < 3 {
        println!("Usage: /register <name> <email> <password> [confirm]");
        return;
    }
    let form = RegisterForm {
        name: args[0].clone(),
        email: args[1].clone(),
        password: args[2].clone(),
        confirm_password: args.get(3).unwrap_or(&args[2]).clone(),
    };
    if let Err(e) = form.validate() {
        return report(&e);
    }

    let result = ctx
        .session
        .borrow_mut()
        .register(&form.name, &form.email, &form.password);
    match result {
        Ok(profile) => {
            println!("Welcome, {}! You are registered as {}", profile.name, profile.role);
            ctx.record(|log| log.register(&profile.email, true, None));
        }
        Err(e) => {
            report(&e);
            let msg = e.to_string();
            ctx.record(|log| log.register(form.email.trim(), false, Some(&msg)));
        }
    }
}

fn cmd_login(ctx: &Context, args: &[String]) {
    if args.len() != 2 {
        println!("Usage: /login <email> <password>");
        return;
    }
    let result = ctx.session.borrow_mut().login(&args[0], &args[1]);
    match result {
        Ok(profile) => {
            println!("Logged in as {} ({})", profile.name, profile.role);
            ctx.record(|log| log.login(&profile.email, true, None));
        }
        Err(e) => {
            report(&e);
            let msg = e.to_string();
            ctx.record(|log| log.login(args[0].trim(), false, Some(&msg)));
        }
    }
}

fn cmd_profile(ctx: &Context, args: &[String]) {
    match args.first().map(String::as_str) {
        None => match ctx.profile() {
            Some(p) => print_profile(&p),
            None => println!("Not logged in"),
        },
        Some("set") => {
            let patch = match ProfilePatch::from_assignments(&args[1..]) {
                Ok(patch) => patch,
                Err(e) => return report(&e),
            };
            if patch.is_empty() {
                println!("Usage: /profile set key=value ...");
                return;
            }
            let result = ctx.session.borrow_mut().update_user(&patch);
            match result {
                Ok(Some(profile)) => {
                    let fields: Vec<String> = args[1..]
                        .iter()
                        .filter_map(|a| a.split_once('=').map(|(k, _)| k.trim().to_string()))
                        .collect();
                    println!("Profile updated");
                    ctx.record(|log| log.profile_update(&profile.email, &fields));
                    print_profile(&profile);
                }
                Ok(None) => println!("Not logged in"),
                Err(e) => report(&e),
            }
        }
        Some(_) => println!("Usage: /profile [set key=value ...]"),
    }
}

fn print_profile(p: &UserProfile) {
    println!("{} <{}>", p.name, p.email);
    println!("  Role:      {}", p.role);
    if !p.phone.is_empty() {
        println!("  Phone:     {}", p.phone);
    }
    if !p.location.is_empty() {
        println!("  Location:  {}", p.location);
    }
    if !p.bio.is_empty() {
        println!("  Bio:       {}", p.bio);
    }
    if !p.avatar_url.is_empty() {
        println!("  Avatar:    {}", p.avatar_url);
    }
    println!("  Joined:    {}", p.joined_at.format("%Y-%m-%d"));
    println!("  Active:    {}", p.last_active.format("%Y-%m-%d %H:%M"));
    println!(
        "  Stats:     {} posts, {} projects, {} followers, {} following",
        p.stats.posts, p.stats.projects, p.stats.followers, p.stats.following
    );
    println!(
        "  Security:  2FA {}{}",
        if p.security.two_factor_enabled { "on" } else { "off" },
        if p.security.last_login_ip.is_empty() {
            String::new()
        } else {
            format!(", last login from {}", p.security.last_login_ip)
        }
    );
    println!(
        "  Prefs:     theme {}, language {}",
        p.preferences.theme.as_str(),
        p.preferences.language
    );
}
