//! Command-line probe for a chores data directory.
//!
//! Usage: `chores_cli [DATA_DIR] [list|repair]`. Set `CHORES_LOG_DIR` to an
//! absolute path to capture core logs.

use chores_core::{
    core_version, default_log_level, init_logging, ChoreService, JsonFileRepository,
    StoreConfig, SystemClock,
};
use log::warn;

fn main() {
    let mut args = std::env::args().skip(1);
    let data_dir = args.next().unwrap_or_else(|| ".".to_string());
    let command = args.next().unwrap_or_else(|| "list".to_string());

    if let Ok(log_dir) = std::env::var("CHORES_LOG_DIR") {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    println!("chores_core version={}", core_version());
    let repo = JsonFileRepository::new(StoreConfig::new(&data_dir));
    let mut service = ChoreService::open(repo, SystemClock);

    match command.as_str() {
        "list" => {
            let tasks = service.list_tasks();
            let open = tasks.iter().filter(|task| task.is_active() && !task.done).count();
            println!("tasks={} open={} people={}", tasks.len(), open, service.list_people().len());
            for task in tasks.iter().filter(|task| task.is_active()) {
                let mark = if task.done { "x" } else { " " };
                println!("[{mark}] {} {} ({})", task.date, task.name, task.recurring);
            }
        }
        "repair" => {
            let commit = service.repair();
            println!(
                "archived={} persisted={}",
                commit.value.total(),
                commit.persisted
            );
            if !commit.persisted {
                warn!("event=cli_repair module=cli status=error persisted=false");
                std::process::exit(1);
            }
        }
        other => {
            eprintln!("unknown command `{other}`; expected list|repair");
            std::process::exit(2);
        }
    }
}
