//! Basic example of the rabt DI container.

use std::sync::atomic::{AtomicUsize, Ordering};

use rabt::prelude::*;

// === Define your types ===

struct Config {
    database_url: String,
}

#[derive(Default)]
struct ConsoleLogger {
    lines: AtomicUsize,
}

impl ConsoleLogger {
    fn log(&self, msg: &str) {
        let n = self.lines.fetch_add(1, Ordering::Relaxed) + 1;
        println!("[LOG {n}] {msg}");
    }
}

struct Database {
    url: String,
    logger: Handle<ConsoleLogger>,
}

impl Database {
    fn query(&self, sql: &str) -> String {
        self.logger.log(&format!("Executing: {sql}"));
        format!("Results from {}", self.url)
    }
}

#[derive(Injectable)]
struct UserRepository {
    db: Handle<Database>,
}

impl UserRepository {
    fn find_user(&self, id: u64) -> String {
        self.db.query(&format!("SELECT * FROM users WHERE id = {id}"))
    }
}

#[derive(Injectable)]
struct UserService {
    repo: Handle<UserRepository>,
    logger: Handle<ConsoleLogger>,
}

impl UserService {
    fn get_user(&self, id: u64) -> String {
        self.logger.log(&format!("Getting user {id}"));
        self.repo.find_user(id)
    }
}

fn main() -> Result<()> {
    // Initialize tracing (logging)
    tracing_subscriber::fmt()
        .with_env_filter("rabt_container=debug")
        .init();

    // Build the container
    let mut container = Container::builder()
        // Config: pre-built singleton
        .instance(Config {
            database_url: "postgres://localhost/myapp".to_string(),
        })
        .singleton_default::<ConsoleLogger>()
        // Database: singleton, depends on Config + ConsoleLogger
        .singleton_with::<Database>(
            vec![TypeKey::of::<Config>(), TypeKey::of::<ConsoleLogger>()],
            |deps| {
                let config: Handle<Config> = deps.next()?;
                Ok(Database {
                    url: config.database_url.clone(),
                    logger: deps.next()?,
                })
            },
        )
        // UserRepository + UserService: new each time
        .transient::<UserRepository>()
        .transient::<UserService>()
        .build()?;

    tracing::info!(?container, "Container built");
    println!("{}", container.describe::<UserService>());

    let service = container.resolve::<UserService>()?;
    println!("{}", service.get_user(42));

    let other = container.resolve::<UserService>()?;
    println!("{}", other.get_user(7));
    println!(
        "Live repositories: {}, databases: {}",
        container.instance_count::<UserRepository>(),
        container.instance_count::<Database>()
    );

    // destroys the repository built for `service`, keeps the database
    container.destroy(&service)?;
    container.destroy(&other)?;
    println!(
        "After destroy: repositories: {}, databases: {}",
        container.instance_count::<UserRepository>(),
        container.instance_count::<Database>()
    );

    Ok(())
}
