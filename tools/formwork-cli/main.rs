use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use formwork::error::SuggestionError;
use formwork::form::FieldRecord;
use formwork::prelude::*;
use serde::Deserialize;
use std::fs;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// --- JSON Deserialization Structs (Input Format Specific) ---
// A form file is a name plus a list of field records; it is converted into
// validated fields through `IntoForm`.

#[derive(Deserialize)]
struct RawForm {
    #[serde(default, alias = "formName")]
    name: String,
    fields: Vec<FieldRecord>,
}

impl IntoForm for RawForm {
    fn into_form(self) -> std::result::Result<FormDraft, SuggestionError> {
        let fields = self
            .fields
            .into_iter()
            .map(Field::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(FormDraft {
            name: self.name,
            fields,
        })
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyCli {
    Scoped,
    All,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortCli {
    Newest,
    Name,
    Fields,
}

/// Compose, fill and store forms with derived fields
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory of the JSON form store
    #[arg(long, env = "FORMWORK_STORE", default_value = "forms", global = true)]
    store: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill a form with values and print every field
    Preview {
        /// Path to the form JSON file
        form_path: String,
        /// Optional path to a JSON object of values keyed by label or id
        values_path: Option<String>,
        /// Reference date for date functions (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Which derived fields are recomputed after each edit
        #[arg(long, value_enum, default_value = "scoped")]
        policy: PolicyCli,
    },
    /// Fill a form and attempt to submit it
    Validate {
        form_path: String,
        values_path: String,
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Save a form into the store
    Save { form_path: String },
    /// List saved forms
    List {
        /// Only show forms whose name or field labels contain this text
        #[arg(short, long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value = "newest")]
        sort: SortCli,
    },
    /// Delete a saved form by id
    Delete { id: String },
    /// Build a form from a text-generation response
    Suggest {
        /// Path to a file holding the raw model response
        response_path: String,
        /// Save the resulting form into the store
        #[arg(long)]
        save: bool,
    },
}

fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: could not install logger: {}", e);
    }

    let cli = Cli::parse();
    match cli.command {
        Command::Preview {
            form_path,
            values_path,
            today,
            policy,
        } => run_preview(&form_path, values_path.as_deref(), today, policy),
        Command::Validate {
            form_path,
            values_path,
            today,
        } => run_validate(&form_path, &values_path, today),
        Command::Save { form_path } => run_save(&cli.store, &form_path),
        Command::List { search, sort } => run_list(&cli.store, search, sort),
        Command::Delete { id } => run_delete(&cli.store, &id),
        Command::Suggest {
            response_path,
            save,
        } => run_suggest(&cli.store, &response_path, save),
    }
}

fn load_workspace(form_path: &str) -> FormWorkspace {
    let json = fs::read_to_string(form_path).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to read form file '{}': {}", form_path, e))
    });
    let raw: RawForm = serde_json::from_str(&json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse form JSON: {}", e)));

    let mut workspace = FormWorkspace::default();
    workspace
        .apply_draft(raw)
        .unwrap_or_else(|e| exit_with_error(&format!("Invalid form: {}", e)));
    for warning in workspace.warnings() {
        println!("Warning: {}", warning);
    }
    workspace
}

fn start_runtime(
    workspace: &FormWorkspace,
    values_path: Option<&str>,
    today: Option<NaiveDate>,
    policy: RecomputePolicy,
) -> FormRuntime {
    let mut evaluator = FormulaEvaluator::builder();
    if let Some(date) = today {
        evaluator = evaluator.today(date);
    }
    let mut runtime = FormRuntime::builder(workspace.fields().to_vec())
        .evaluator(evaluator.build())
        .recompute(policy)
        .build()
        .unwrap_or_else(|e| exit_with_error(&format!("Cannot start form: {}", e)));

    if let Some(path) = values_path {
        let values = ValueSheet::from_file(path).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to load values from '{}': {}", path, e))
        });
        values
            .apply_to(&mut runtime)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to apply values: {}", e)));
    }
    runtime
}

fn print_views(runtime: &FormRuntime) {
    for view in runtime.views() {
        let marker = if view.is_derived { "=" } else { ":" };
        let required = if view.required { " *" } else { "" };
        println!("  {}{} {} {}", view.label, required, marker, view.value);
        if let Some(helper) = view.helper_text() {
            println!("      ({})", helper);
        }
    }
}

fn run_preview(
    form_path: &str,
    values_path: Option<&str>,
    today: Option<NaiveDate>,
    policy: PolicyCli,
) {
    let workspace = load_workspace(form_path);
    let policy = match policy {
        PolicyCli::Scoped => RecomputePolicy::Scoped,
        PolicyCli::All => RecomputePolicy::All,
    };
    let runtime = start_runtime(&workspace, values_path, today, policy);

    println!("\n--- {} ---", display_name(&workspace));
    print_views(&runtime);
}

fn run_validate(form_path: &str, values_path: &str, today: Option<NaiveDate>) {
    let workspace = load_workspace(form_path);
    let mut runtime = start_runtime(
        &workspace,
        Some(values_path),
        today,
        RecomputePolicy::default(),
    );

    let outcome = runtime
        .submit()
        .unwrap_or_else(|e| exit_with_error(&format!("Submission failed: {}", e)));
    match outcome {
        SubmitOutcome::Submitted(submission) => {
            let json = serde_json::to_string_pretty(&submission).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to serialize submission: {}", e))
            });
            println!("Form submitted successfully!");
            println!("{}", json);
        }
        SubmitOutcome::Rejected(_) => {
            println!("Form has validation errors:");
            print_views(&runtime);
            std::process::exit(2);
        }
    }
}

fn open_store(dir: &str) -> JsonFileStore {
    JsonFileStore::open(dir)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to open store: {}", e)))
}

fn save_workspace(store_dir: &str, workspace: &mut FormWorkspace) {
    let snapshot = workspace
        .snapshot()
        .unwrap_or_else(|e| exit_with_error(&format!("Cannot save form: {}", e)));
    let stored = open_store(store_dir)
        .save(snapshot)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to save form: {}", e)));
    println!(
        "Saved '{}' ({} fields) as {}",
        stored.name,
        stored.field_count(),
        stored.id
    );
}

fn run_save(store_dir: &str, form_path: &str) {
    let mut workspace = load_workspace(form_path);
    save_workspace(store_dir, &mut workspace);
}

fn run_list(store_dir: &str, search: Option<String>, sort: SortCli) {
    let store = open_store(store_dir);
    let forms = store
        .list()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read store: {}", e)));
    let current = store
        .current()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read store: {}", e)))
        .map(|f| f.id);

    let sort = match sort {
        SortCli::Newest => SortOrder::Newest,
        SortCli::Name => SortOrder::Name,
        SortCli::Fields => SortOrder::FieldCount,
    };
    let query = CatalogQuery::new()
        .search(search.unwrap_or_default())
        .sort(sort);
    let matching = query.apply(&forms);

    if matching.is_empty() {
        println!("No saved forms found.");
        return;
    }
    for form in matching {
        let active = if current.as_deref() == Some(form.id.as_str()) {
            " (current)"
        } else {
            ""
        };
        println!(
            "{}  {}  {} fields  {}{}",
            form.id,
            form.created_at.format("%Y-%m-%d %H:%M"),
            form.field_count(),
            form.name,
            active
        );
    }
}

fn run_delete(store_dir: &str, id: &str) {
    open_store(store_dir)
        .delete(id)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to delete form: {}", e)));
    println!("Deleted form {}", id);
}

fn run_suggest(store_dir: &str, response_path: &str, save: bool) {
    let response = fs::read_to_string(response_path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to read response file '{}': {}",
            response_path, e
        ))
    });
    let suggestion = FormSuggestion::from_response(&response)
        .unwrap_or_else(|e| exit_with_error(&format!("Unusable suggestion: {}", e)));

    let mut workspace = FormWorkspace::default();
    workspace
        .apply_draft(suggestion)
        .unwrap_or_else(|e| exit_with_error(&format!("Unusable suggestion: {}", e)));

    println!("\n--- {} ---", display_name(&workspace));
    for field in workspace.fields() {
        let required = if field.is_required() { " *" } else { "" };
        println!("  {}{} [{}]", field.display_name(), required, field.field_type());
    }

    if save {
        save_workspace(store_dir, &mut workspace);
    }
}

fn display_name(workspace: &FormWorkspace) -> &str {
    if workspace.name().trim().is_empty() {
        "Untitled form"
    } else {
        workspace.name()
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
