// Entry point and high-level CLI flow.
//
// - Option [1] loads the XML report and lists the sections it lacks.
// - Option [2] previews every dashboard table and writes the exports.
// - Option [3] prints the parsed XML tree as JSON.
// With --batch the report is loaded and exported once, no menu.
use anyhow::Context;
use eap_report::config::{self, Command, Config};
use eap_report::{loader, output, util, xml, DashboardModel, ReportSchema};
use env_logger::Env;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

const PREVIEW_ROWS: usize = 5;

// The loaded model survives between menu choices so exports can be
// regenerated without reading the file again.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState::default()));

#[derive(Default)]
struct AppState {
    schema: ReportSchema,
    loaded: Option<Loaded>,
}

#[derive(Clone)]
struct Loaded {
    model: DashboardModel,
    source: String,
}

fn state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(|e| e.into_inner())
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
///
/// `None` once stdin is closed.
fn read_choice() -> Option<String> {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Main Menu (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        if io::stdin().read_line(&mut buf).unwrap_or(0) == 0 {
            return false;
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]. Returns whether a model is now loaded.
fn handle_load(config: &Config) -> bool {
    let schema = state().schema.clone();
    match loader::load_report(&config.input, &schema) {
        Ok((model, report)) => {
            println!(
                "Loaded {} ({} bytes, {} sections found)",
                config.input.display(),
                util::format_int(report.bytes as i64),
                report.sections_found
            );
            println!("Total clients: {}", util::format_int(model.total_clients));
            if !report.sections_missing.is_empty() {
                println!("Not in this report: {}", report.sections_missing.join(", "));
            }
            println!();
            state().loaded = Some(Loaded {
                model,
                source: config.input.display().to_string(),
            });
            true
        }
        Err(e) => {
            log::debug!("Load failed: {e}");
            eprintln!("{}\n", e.user_message());
            false
        }
    }
}

/// Handle option [2]. Returns whether the exports were written.
fn handle_generate(config: &Config) -> bool {
    let loaded = state().loaded.clone();
    let Some(loaded) = loaded else {
        println!("Error: No report loaded. Please load the XML file first (option 1).\n");
        return false;
    };

    println!("Generating dashboard...\n");
    match output::export_dashboard(&loaded.model, &loaded.source, &config.output_dir, PREVIEW_ROWS)
    {
        Ok(written) => {
            println!("Outputs saved to {}:", config.output_dir.display());
            for path in written {
                println!("  {}", path.display());
            }
            println!();
            true
        }
        Err(e) => {
            eprintln!("Write error: {}\n", e);
            false
        }
    }
}

/// Handle option [3]: the object view of the raw report tree.
fn handle_dump_tree(config: &Config) {
    let opts = state().schema.parser.clone();
    let text = match std::fs::read_to_string(&config.input) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Could not read {}: {}\n", config.input.display(), e);
            return;
        }
    };
    match xml::parse_with(&text, &opts) {
        Ok(root) => match serde_json::to_string_pretty(&root.to_value(&opts)) {
            Ok(json) => println!("{}\n", json),
            Err(e) => eprintln!("Could not render tree: {}\n", e),
        },
        Err(e) => {
            log::debug!("Parse failed: {e}");
            eprintln!("{}\n", eap_report::error::USER_MESSAGE);
        }
    }
}

fn run_menu(config: &Config) {
    loop {
        println!("EAP Report Dashboard ({})", config.input.display());
        println!("[1] Load the XML report");
        println!("[2] Generate dashboard exports");
        println!("[3] Dump parsed XML tree\n");
        let Some(choice) = read_choice() else {
            println!("Exiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => {
                handle_load(config);
            }
            "2" => {
                println!();
                handle_generate(config);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => handle_dump_tree(config),
            _ => {
                println!("Invalid choice. Please enter 1, 2 or 3.\n");
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("eap_report");
    let opts = config::get_opts();
    let usage = opts.usage(&format!("Usage: {} [OPTIONS] [INPUT]", program));

    let config = match config::parse_options(&opts, &args, |key| std::env::var(key).ok()) {
        Ok(Command::Run(config)) => config,
        Ok(Command::PrintSchema(path)) => {
            let schema = match &path {
                Some(path) => ReportSchema::from_file(path)
                    .with_context(|| format!("loading report schema {}", path.display()))?,
                None => ReportSchema::default(),
            };
            print!("{}", schema.to_toml_string()?);
            return Ok(());
        }
        Ok(Command::Usage) => {
            println!("{}", usage);
            return Ok(());
        }
        Err(e) => {
            eprintln!("{}", e);
            println!("{}", usage);
            std::process::exit(2);
        }
    };

    if let Some(path) = &config.schema {
        let schema = ReportSchema::from_file(path)
            .with_context(|| format!("loading report schema {}", path.display()))?;
        state().schema = schema;
    }

    if config.batch {
        if !handle_load(&config) || !handle_generate(&config) {
            std::process::exit(1);
        }
        return Ok(());
    }

    run_menu(&config);
    Ok(())
}
