//! Unit catalog command.

#![allow(clippy::print_literal)]

use clap::Args;
use patchwire_core::{PortDirection, PortSpec};
use patchwire_units::{UnitCategory, UnitDescriptor, UnitRegistry};

#[derive(Args)]
pub struct UnitsArgs {
    /// Show ports and parameters of one unit type
    #[arg(value_name = "UNIT")]
    unit: Option<String>,
}

const CATEGORIES: [UnitCategory; 5] = [
    UnitCategory::Source,
    UnitCategory::Modulation,
    UnitCategory::Processor,
    UnitCategory::Control,
    UnitCategory::Routing,
];

pub fn run(args: UnitsArgs) -> anyhow::Result<()> {
    let registry = UnitRegistry::new();

    if let Some(tag) = &args.unit {
        let desc = registry
            .descriptor(&tag.to_ascii_lowercase())
            .ok_or_else(|| anyhow::anyhow!("Unknown unit: {}", tag))?;
        print_details(desc);
        return Ok(());
    }

    println!("Available units:");
    for category in CATEGORIES {
        println!();
        println!("{}:", category.name());
        for desc in registry.units_in_category(category) {
            println!("  {:12}  {}", desc.id, desc.description);
        }
    }
    println!();
    println!("Use 'patchwire units <UNIT>' for ports and parameters.");
    Ok(())
}

fn port_list(ports: &[PortSpec], direction: PortDirection) -> Vec<String> {
    ports
        .iter()
        .filter(|p| p.direction == direction)
        .map(|p| format!("{} ({})", p.id, p.kind.as_str()))
        .collect()
}

fn print_details(desc: &UnitDescriptor) {
    println!("{} [{}]", desc.name, desc.id);
    println!("{}", "=".repeat(desc.name.len() + desc.id.len() + 3));
    println!();
    println!("{}", desc.description);
    println!();

    let inputs = port_list(desc.ports, PortDirection::Input);
    let outputs = port_list(desc.ports, PortDirection::Output);
    println!("Inputs:   {}", if inputs.is_empty() { "-".into() } else { inputs.join(", ") });
    println!("Outputs:  {}", if outputs.is_empty() { "-".into() } else { outputs.join(", ") });
    println!();

    if desc.params.is_empty() {
        println!("No parameters.");
    } else {
        println!("Parameters:");
        println!();
        println!("  {:12}  {:>12}  {}", "Name", "Default", "Range");
        println!("  {:12}  {:>12}  {}", "----", "-------", "-----");
        for param in desc.params {
            let suffix = param.unit.suffix();
            println!(
                "  {:12}  {:>12}  {}..{}{}",
                param.key,
                format!("{}{}", param.default, suffix),
                param.min,
                param.max,
                suffix
            );
        }
    }

    if !desc.string_params.is_empty() {
        println!();
        println!("Text parameters: {}", desc.string_params.join(", "));
    }
}
