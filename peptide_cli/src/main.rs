use clap::{Parser, Subcommand};
use peptide_core::engine::{diluent_candidates, format_unit_mark};
use peptide_core::*;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "pep")]
#[command(about = "Peptide reconstitution and dose calculator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Work out how much water to add and where to draw to
    Calc {
        /// Peptide in the vial, in mg
        #[arg(long, default_value = "")]
        vial: String,

        /// Dose per injection
        #[arg(long, default_value = "")]
        dose: String,

        /// Dose unit (mcg, mg)
        #[arg(long)]
        unit: Option<String>,

        /// Syringe type (U-100, U-50, U-40)
        #[arg(long)]
        syringe: Option<String>,

        /// Doses per week, used to estimate how long the vial lasts
        #[arg(long)]
        frequency: Option<String>,

        /// Bacteriostatic water already added, in ml
        #[arg(long)]
        diluent: Option<String>,

        /// Also list every workable water volume
        #[arg(long)]
        options: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List supported dosing frequencies
    Frequencies,

    /// Build a purchase order
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },

    /// Manage the local data store
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// List peptides and supplies with their ids
    Show,

    /// Render the printable order
    Print,

    /// List vial size presets
    Sizes,

    /// Set the vendor name
    Vendor { name: String },

    /// Add a peptide line
    AddPeptide {
        name: String,

        #[arg(long, default_value = "10 mg")]
        vial_size: String,

        #[arg(long, default_value_t = 1)]
        quantity: u32,
    },

    /// Add a custom supply line
    AddSupply { name: String },

    /// Put a supply on the order
    Check { id: String },

    /// Take a supply off the order
    Uncheck { id: String },

    /// Remove a peptide or supply line
    Remove { id: String },

    /// Export the order as CSV
    Export {
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Save the draft as an order and start a new one
    Finalize,

    /// Discard the draft
    Reset,
}

#[derive(Subcommand)]
enum StoreAction {
    /// Delete all locally stored data
    Clear,
}

fn main() -> Result<()> {
    peptide_core::logging::init();

    let cli = Cli::parse();

    let errors = peptide_core::tables::validate();
    if !errors.is_empty() {
        eprintln!("Reference table errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Tables("Invalid reference tables".into()));
    }

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());

    match cli.command {
        Commands::Calc {
            vial,
            dose,
            unit,
            syringe,
            frequency,
            diluent,
            options,
            json,
        } => {
            let raw = RawDosageInput {
                vial_mg: vial,
                dose,
                dose_unit: unit
                    .unwrap_or_else(|| config.calculator.default_dose_unit.to_string()),
                syringe: syringe.unwrap_or_else(|| config.calculator.default_syringe.to_string()),
                doses_per_week: frequency.unwrap_or_default(),
                diluent_ml: diluent.unwrap_or_default(),
            };
            cmd_calc(&raw, options, json)
        }
        Commands::Frequencies => {
            cmd_frequencies();
            Ok(())
        }
        Commands::Order { action } => cmd_order(&data_dir, action, &config),
        Commands::Store {
            action: StoreAction::Clear,
        } => {
            let path = LocalStore::path_in(&data_dir);
            LocalStore::clear(&path)?;
            println!("✓ Local data cleared");
            Ok(())
        }
    }
}

fn cmd_calc(raw: &RawDosageInput, options: bool, json: bool) -> Result<()> {
    let request = raw.parse();
    let result = request.as_ref().and_then(DosageRequest::compute);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let (request, result) = match (request, result) {
        (Some(request), Some(result)) => (request, result),
        _ => {
            println!("Fill in all inputs to calculate");
            return Ok(());
        }
    };

    display_result(&request, &result);

    if options && !result.was_overridden {
        let dose_mg = request.dose.in_mg();
        let candidates =
            diluent_candidates(request.vial_strength_mg, dose_mg, request.syringe_type);
        println!("  Workable water volumes:");
        if candidates.is_empty() {
            println!("    (none within 2-100 units)");
        }
        for candidate in candidates {
            let marker = if candidate.diluent_ml == result.diluent_used_ml {
                "→"
            } else {
                " "
            };
            println!(
                "  {} {:>4} ml  {:>5} units",
                marker,
                candidate.diluent_ml,
                format_unit_mark(candidate.syringe_units)
            );
        }
        println!();
    }

    Ok(())
}

fn display_result(request: &DosageRequest, result: &DosageResult) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  RECONSTITUTION");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!(
        "  Bacteriostatic water: {} ml{}",
        result.diluent_used_ml,
        if result.was_overridden {
            ""
        } else {
            " (recommended)"
        }
    );
    println!(
        "  Concentration:        {:.3} mg/ml",
        result.concentration_mg_per_ml
    );
    println!("  Draw volume:          {:.3} ml", result.draw_volume_ml);
    println!(
        "  Syringe units:        {} on {}",
        format_unit_mark(result.syringe_unit_mark),
        request.syringe_type
    );
    println!("  Doses per vial:       {:.1}", result.total_doses_per_vial);
    if let Some(ref label) = result.frequency_label {
        println!("  Frequency:            {}", label);
    }
    if let Some(ref supply) = result.supply_label {
        println!("  Vial lasts:           {}", supply);
    }
    println!();
    println!("  1. {}", result.reconstitution_text);
    println!("  2. {}", result.draw_text);
    println!();
}

fn cmd_frequencies() {
    for freq in peptide_core::tables::FREQUENCIES {
        println!("  {:>4}  {}", freq.doses_per_week, freq.label);
    }
}

fn draft<'a>(store: &'a mut LocalStore, config: &Config) -> &'a mut OrderBuilder {
    if store.purchase_draft.is_none() {
        store.purchase_draft = Some(OrderBuilder::with_vendor(config.order.vendor_name.clone()));
    }
    store.draft_mut()
}

fn set_checked(store: &mut LocalStore, config: &Config, id: &str, checked: bool) -> Result<()> {
    draft(store, config).update_supply(
        id,
        SupplyPatch {
            checked: Some(checked),
            ..Default::default()
        },
    )
}

fn cmd_order(data_dir: &std::path::Path, action: OrderAction, config: &Config) -> Result<()> {
    let path = LocalStore::path_in(data_dir);

    match action {
        OrderAction::Show => {
            let mut store = LocalStore::load(&path)?;
            display_draft(draft(&mut store, config));
        }
        OrderAction::Print => {
            let mut store = LocalStore::load(&path)?;
            print!("{}", draft(&mut store, config).render_checklist(chrono::Utc::now()));
        }
        OrderAction::Sizes => {
            for size in peptide_core::tables::VIAL_SIZES {
                if *size != peptide_core::tables::CUSTOM_VIAL_SIZE {
                    println!("  {}", size);
                }
            }
        }
        OrderAction::Vendor { name } => {
            LocalStore::update(&path, |store| {
                draft(store, config).vendor_name = name.trim().to_string();
                Ok(())
            })?;
            println!("✓ Vendor set");
        }
        OrderAction::AddPeptide {
            name,
            vial_size,
            quantity,
        } => {
            let mut added = None;
            LocalStore::update(&path, |store| {
                added = Some(draft(store, config).add_peptide(&name, &vial_size, quantity)?);
                Ok(())
            })?;
            if let Some(id) = added {
                println!("✓ Added {} ({} x{}) [{}]", name.trim(), vial_size.trim(), quantity, id);
            }
        }
        OrderAction::AddSupply { name } => {
            let mut added = None;
            LocalStore::update(&path, |store| {
                added = Some(draft(store, config).add_custom_supply(&name)?);
                Ok(())
            })?;
            if let Some(id) = added {
                println!("✓ Added supply {} [{}]", name.trim(), id);
            }
        }
        OrderAction::Check { id } => {
            LocalStore::update(&path, |store| set_checked(store, config, &id, true))?;
            println!("✓ Checked {}", id);
        }
        OrderAction::Uncheck { id } => {
            LocalStore::update(&path, |store| set_checked(store, config, &id, false))?;
            println!("✓ Unchecked {}", id);
        }
        OrderAction::Remove { id } => {
            LocalStore::update(&path, |store| {
                let builder = draft(store, config);
                let removed = builder.remove_supply(&id)
                    || Uuid::parse_str(&id)
                        .map(|uuid| builder.remove_peptide(uuid))
                        .unwrap_or(false);
                if removed {
                    Ok(())
                } else {
                    Err(Error::Order(format!("No line with id {}", id)))
                }
            })?;
            println!("✓ Removed {}", id);
        }
        OrderAction::Export { output } => {
            let mut store = LocalStore::load(&path)?;
            let builder = draft(&mut store, config);
            let rows = match output {
                Some(ref file) => {
                    let rows = builder.write_csv(std::fs::File::create(file)?)?;
                    println!("✓ Exported {} lines to {}", rows, file.display());
                    rows
                }
                None => builder.write_csv(std::io::stdout().lock())?,
            };
            tracing::debug!("Exported {} order lines", rows);
        }
        OrderAction::Finalize => {
            let mut saved = None;
            LocalStore::update(&path, |store| {
                saved = Some(store.finalize_draft(None, chrono::Utc::now())?);
                Ok(())
            })?;
            if let Some(order) = saved {
                println!("✓ Saved order {}", order.id);
            }
        }
        OrderAction::Reset => {
            LocalStore::update(&path, |store| {
                store.purchase_draft = None;
                Ok(())
            })?;
            println!("✓ Order draft discarded");
        }
    }

    Ok(())
}

fn display_draft(builder: &OrderBuilder) {
    let vendor = if builder.vendor_name.is_empty() {
        "(no vendor)"
    } else {
        builder.vendor_name.as_str()
    };
    println!("Vendor: {}", vendor);
    println!();
    println!("Peptides:");
    if builder.peptides.is_empty() {
        println!("  (none)");
    }
    for peptide in &builder.peptides {
        println!(
            "  {}  {} — {} x{}",
            peptide.id, peptide.name, peptide.vial_size, peptide.quantity
        );
    }
    println!();
    println!("Supplies:");
    for supply in &builder.supplies {
        println!(
            "  [{}] {}  {} x{}",
            if supply.checked { "x" } else { " " },
            supply.id,
            supply.name,
            supply.quantity
        );
    }
}
