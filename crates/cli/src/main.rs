use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use forms::{Field, FormTemplate, PrefillRule, Template};
use grants_core::config::{
    approval_history_from_env_value, debounce_from_env_value, status_editor_roles_from_env_value,
};
use grants_core::constants::DEFAULT_DATA_DIR;
use grants_core::{
    Actor, AttributePatch, CoreConfig, FormInstanceService, FormStatus, NewInstance,
    NonEmptyText, Organisation, RecordId, RoleName,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "grants")]
#[command(about = "Grant form administration CLI")]
struct Cli {
    /// User id recorded on changes
    #[arg(long, global = true, default_value = "grants-cli")]
    user: String,
    /// Role the changes are made as
    #[arg(long, global = true, default_value = "ADMIN")]
    role: String,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Form template documents
    #[command(subcommand)]
    Template(TemplateCommands),
    /// Organisation records
    #[command(subcommand)]
    Organisation(OrganisationCommands),
    /// Form instances
    #[command(subcommand)]
    Instances(InstanceCommands),
    /// Change an instance's status
    Status {
        instance_id: String,
        /// Status label, e.g. "Under Review"
        label: String,
    },
    /// Submit a completed instance
    Submit { instance_id: String },
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// List stored templates
    List,
    /// Parse and validate a template file without storing it
    Check { path: PathBuf },
    /// Validate and store a template file
    Import { path: PathBuf },
}

#[derive(Subcommand)]
enum OrganisationCommands {
    /// Store an organisation from a YAML file
    Import { path: PathBuf },
}

#[derive(Subcommand)]
enum InstanceCommands {
    /// List an organisation's instances
    List { organisation_id: String },
    /// Print an instance with prefilled answers and progress
    Show { instance_id: String },
    /// Start a draft instance of a template
    Create {
        template_id: String,
        organisation_id: String,
        #[arg(long)]
        title: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due_date: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("grants=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'grants --help' for commands");
        return Ok(());
    };

    if let Commands::Template(TemplateCommands::Check { path }) = &command {
        let template = read_template(path)?;
        print_template_summary(&template);
        return Ok(());
    }

    let service = FormInstanceService::new(config_from_env()?);
    let actor = Actor::new(
        NonEmptyText::new(&cli.user).context("--user cannot be blank")?,
        RoleName::new(&cli.role).context("invalid --role")?,
    );

    match command {
        Commands::Template(TemplateCommands::Check { .. }) => {}
        Commands::Template(TemplateCommands::List) => {
            let templates = service.templates()?;
            if templates.is_empty() {
                println!("No form templates found.");
            }
            for template in templates {
                println!(
                    "ID: {}, Name: {}, Type: {:?}, Active: {}",
                    template.id, template.name, template.template_type, template.active
                );
            }
        }
        Commands::Template(TemplateCommands::Import { path }) => {
            let template = read_template(&path)?;
            service.import_template(&template)?;
            println!("Imported template {} ({})", template.name, template.id);
        }
        Commands::Organisation(OrganisationCommands::Import { path }) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let organisation: Organisation = serde_yaml::from_str(&text)
                .with_context(|| format!("parsing {}", path.display()))?;
            service.import_organisation(&organisation)?;
            println!(
                "Imported organisation {} ({})",
                organisation.name, organisation.id
            );
        }
        Commands::Instances(InstanceCommands::List { organisation_id }) => {
            let id = parse_id(&organisation_id)?;
            let instances = service.list_for_organisation(&actor, &id)?;
            if instances.is_empty() {
                println!("No form instances found.");
            }
            for instance in instances {
                println!(
                    "ID: {}, Title: {}, Status: {}, Created: {}",
                    instance.id, instance.title, instance.form_status, instance.created_at
                );
            }
        }
        Commands::Instances(InstanceCommands::Show { instance_id }) => {
            let view = service.read(&actor, &parse_id(&instance_id)?)?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Commands::Instances(InstanceCommands::Create {
            template_id,
            organisation_id,
            title,
            due_date,
        }) => {
            let due_date = due_date
                .map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d"))
                .transpose()
                .context("--due-date must be YYYY-MM-DD")?;
            let instance = service.create_instance(
                &actor,
                NewInstance {
                    form_template_id: parse_id(&template_id)?,
                    local_development_agency_id: parse_id(&organisation_id)?,
                    title,
                    due_date,
                },
            )?;
            println!("Created {} ({})", instance.title, instance.id);
        }
        Commands::Status { instance_id, label } => {
            let status: FormStatus = label.parse()?;
            let patch = AttributePatch {
                form_status: Some(status),
                ..AttributePatch::default()
            };
            let outcome = service
                .patch_instance(&actor, &parse_id(&instance_id)?, patch)
                .await?;
            println!(
                "{} is now {}",
                outcome.instance.id, outcome.instance.form_status
            );
            if let Some(child) = outcome.created_linked_instance {
                println!("Created linked instance {} ({})", child.title, child.id);
            }
        }
        Commands::Submit { instance_id } => {
            let instance = service.submit(&actor, &parse_id(&instance_id)?).await?;
            println!("Submitted {} ({})", instance.title, instance.id);
        }
    }

    Ok(())
}

fn config_from_env() -> anyhow::Result<Arc<CoreConfig>> {
    let data_dir = PathBuf::from(
        std::env::var("GRANTS_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into()),
    );
    if !data_dir.is_dir() {
        anyhow::bail!("data directory {} does not exist", data_dir.display());
    }

    let cfg = CoreConfig::new(
        data_dir,
        status_editor_roles_from_env_value(std::env::var("GRANTS_STATUS_EDITOR_ROLES").ok())?,
        approval_history_from_env_value(std::env::var("GRANTS_APPROVAL_HISTORY").ok())?,
        debounce_from_env_value(std::env::var("GRANTS_DEBOUNCE_MS").ok())?,
    )?;
    Ok(Arc::new(cfg))
}

fn parse_id(raw: &str) -> anyhow::Result<RecordId> {
    RecordId::parse(raw).with_context(|| format!("'{raw}' is not a record id"))
}

/// Templates are YAML unless the file ends in `.json`.
fn read_template(path: &Path) -> anyhow::Result<FormTemplate> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let parsed = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Template::parse_json(&text),
        _ => Template::parse_yaml(&text),
    };
    parsed.with_context(|| format!("parsing {}", path.display()))
}

fn print_template_summary(template: &FormTemplate) {
    println!(
        "{} ({}) {:?}, active: {}",
        template.name, template.id, template.template_type, template.active
    );
    if let Some(linked) = template.linked_form_template_id {
        println!("  creates linked instances of {linked}");
    }

    let Some(form) = &template.form else {
        println!("  no form");
        return;
    };
    for section in &form.sections {
        let required = section.fields.iter().filter(|f| f.required()).count();
        println!(
            "  {}: {} fields, {} required",
            section.title,
            section.fields.len(),
            required
        );
        for field in &section.fields {
            warn_unsupported(field.name(), field.prefill());
            if let Field::Group(group) = field {
                for (key, sub) in group.keyed_subfields() {
                    warn_unsupported(&key, sub.prefill.as_ref());
                }
            }
        }
    }
}

fn warn_unsupported(key: &str, rule: Option<&PrefillRule>) {
    if let Some(PrefillRule::Unsupported { source, path }) = rule {
        println!("  warning: {key} prefills from unknown {source}.{path}; it will stay empty");
    }
}
