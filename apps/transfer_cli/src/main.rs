use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use client_core::{
    config::{self, Settings},
    HttpTransferApi, PersistenceBridge, SortSpec, TransferApi, TransferList,
};
use shared::{
    domain::{AccountId, TemplateId},
    protocol::{BeneficiaryQuery, DraftSeed, TemplateLoadRequest},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "transfer-xml", about = "Assemble bank transfer batches and export them as XML")]
struct Args {
    /// Settings file, defaults to ./transfer_xml.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Overrides the configured API base URL.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search beneficiaries.
    Beneficiaries {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        include_inactive: bool,
    },
    /// Load a transfer template into a drafts file.
    Template {
        #[arg(long)]
        template_id: i64,
        #[arg(long)]
        execution_date: NaiveDate,
        #[arg(long)]
        account_id: Option<i64>,
        /// Drafts file to write; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Save the transfers of a drafts file and generate the bank XML.
    Export {
        #[arg(long)]
        drafts: PathBuf,
        #[arg(long)]
        batch_name: String,
        #[arg(long)]
        account_id: Option<i64>,
        /// `field` or `field:desc`; fields: beneficiary, amount, date, remittance.
        #[arg(long)]
        sort: Option<SortSpec>,
        /// XML file to write; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Write server ids back into the drafts file after saving.
        #[arg(long)]
        update_drafts: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => config::load_settings_from(path)?,
        None => config::load_settings()?,
    };
    if let Some(url) = args.api_url {
        settings.api_base_url = url;
    }
    let api = Arc::new(HttpTransferApi::from_settings(&settings)?);
    info!(api = %api.base_url(), "using transfer api");

    match args.command {
        Command::Beneficiaries {
            search,
            include_inactive,
        } => list_beneficiaries(api.as_ref(), search, !include_inactive).await,
        Command::Template {
            template_id,
            execution_date,
            account_id,
            out,
        } => {
            let request = TemplateLoadRequest {
                template_id: TemplateId(template_id),
                originator_account_id: account_for(account_id, &settings),
                execution_date,
            };
            load_template(api.as_ref(), &request, out).await
        }
        Command::Export {
            drafts,
            batch_name,
            account_id,
            sort,
            out,
            update_drafts,
        } => {
            let account = account_for(account_id, &settings);
            export(api, &drafts, &batch_name, account, sort, out, update_drafts).await
        }
    }
}

fn account_for(explicit: Option<i64>, settings: &Settings) -> Option<AccountId> {
    explicit.map(AccountId).or(settings.default_account_id)
}

async fn list_beneficiaries(
    api: &dyn TransferApi,
    search: Option<String>,
    active_only: bool,
) -> Result<()> {
    let page = api
        .search_beneficiaries(&BeneficiaryQuery {
            search,
            is_active: active_only,
            page: None,
        })
        .await
        .context("beneficiary search failed")?;

    for beneficiary in &page.results {
        println!(
            "{:>6}  {:<32}  {:<26}  {}",
            beneficiary.id.0,
            beneficiary.name,
            beneficiary.account_number,
            beneficiary.description.as_deref().unwrap_or_default()
        );
    }
    println!("{} of {} beneficiaries", page.results.len(), page.count);
    Ok(())
}

async fn load_template(
    api: &dyn TransferApi,
    request: &TemplateLoadRequest,
    out: Option<PathBuf>,
) -> Result<()> {
    let seeds = api
        .load_template(request)
        .await
        .with_context(|| format!("failed to load template {}", request.template_id))?;
    let json = serde_json::to_string_pretty(&seeds)?;
    match out {
        Some(path) => {
            fs::write(&path, json)
                .with_context(|| format!("failed to write drafts file '{}'", path.display()))?;
            println!("Wrote {} transfers to {}", seeds.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn export(
    api: Arc<dyn TransferApi>,
    drafts: &Path,
    batch_name: &str,
    account: Option<AccountId>,
    sort: Option<SortSpec>,
    out: Option<PathBuf>,
    update_drafts: bool,
) -> Result<()> {
    let raw = fs::read_to_string(drafts)
        .with_context(|| format!("failed to read drafts file '{}'", drafts.display()))?;
    let seeds: Vec<DraftSeed> = serde_json::from_str(&raw)
        .with_context(|| format!("drafts file '{}' is not a transfer list", drafts.display()))?;
    let mut list = TransferList::from_seeds(seeds)?;
    if let Some(spec) = sort {
        list.sort_by(spec.field, spec.direction);
    }

    let mut bridge = PersistenceBridge::new(api);
    let saved = match bridge.save(&mut list, account).await {
        Ok(saved) => saved,
        Err(err) => {
            for message in err.messages() {
                eprintln!("{message}");
            }
            bail!("saving '{batch_name}' failed: {err}");
        }
    };
    println!(
        "Saved {} new transfers ({} already saved)",
        saved.created.len(),
        saved.already_persisted
    );

    // Rows now exist on the server; record their ids even if XML generation fails.
    if update_drafts {
        write_drafts(drafts, &list)?;
    }

    let xml = match bridge.generate_xml(&list, batch_name).await {
        Ok(xml) => xml,
        Err(err) => {
            for message in err.messages() {
                eprintln!("{message}");
            }
            bail!("xml generation for '{batch_name}' failed: {err}");
        }
    };

    match out {
        Some(path) => {
            fs::write(&path, &xml.xml)
                .with_context(|| format!("failed to write xml '{}'", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", xml.xml),
    }
    Ok(())
}

fn write_drafts(path: &Path, list: &TransferList) -> Result<()> {
    let seeds: Vec<DraftSeed> = list.displayed().map(|row| row.to_seed()).collect();
    fs::write(path, serde_json::to_string_pretty(&seeds)?)
        .with_context(|| format!("failed to update drafts file '{}'", path.display()))
}
