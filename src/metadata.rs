//! NetCDF file inspection
//!
//! Listing helpers for the CLI: dimensions, variables and the UGRID
//! attributes that matter when deciding what can be plotted.

use crate::cube::CubeSummary;
use crate::errors::Result;
use crate::ugrid::attr_string;
use netcdf::File;

/// Prints global attributes and variables of a NetCDF file.
pub fn print_metadata(file: &File) -> Result<()> {
    println!("\n===== Global Attributes =====");
    for attr in file.attributes() {
        println!("- {}: {:?}", attr.name(), attr.value()?);
    }

    println!("\n===== Variables =====");
    for var in file.variables() {
        let dims: Vec<String> = var
            .dimensions()
            .iter()
            .map(|d| format!("{}[{}]", d.name(), d.len()))
            .collect();
        println!("- {} ({})", var.name(), dims.join(", "));
    }

    Ok(())
}

/// Lists all variables and dimensions in a clean, organized format.
pub fn list_variables_and_dimensions(file: &File) -> Result<()> {
    println!("\n Dimensions");
    println!("==============");

    let mut dimensions: Vec<_> = file.dimensions().collect();
    dimensions.sort_by(|a, b| a.name().cmp(&b.name()));

    if dimensions.is_empty() {
        println!("   (No dimensions found)");
    } else {
        for dim in dimensions {
            let length_info = if dim.is_unlimited() {
                format!("{} (unlimited)", dim.len())
            } else {
                dim.len().to_string()
            };
            println!("    {} = {}", dim.name(), length_info);
        }
    }

    println!("\n Variables");
    println!("=============");

    let mut variables: Vec<_> = file.variables().collect();
    variables.sort_by(|a, b| a.name().cmp(&b.name()));

    if variables.is_empty() {
        println!("   (No variables found)");
    } else {
        for var in variables {
            let data_type = format!("{:?}", var.vartype()).to_lowercase();

            let dims: Vec<String> = var
                .dimensions()
                .iter()
                .map(|d| d.name().to_string())
                .collect();

            let shape: Vec<String> = var
                .dimensions()
                .iter()
                .map(|d| d.len().to_string())
                .collect();

            if dims.is_empty() {
                println!("    {} ({}): scalar", var.name(), data_type);
            } else {
                println!(
                    "    {} ({}): [{}] = ({})",
                    var.name(),
                    data_type,
                    dims.join(", "),
                    shape.join(" x ")
                );
            }

            // Show the attributes that decide how a variable plots.
            let mut key_attrs = Vec::new();
            for attr in ["units", "standard_name", "cf_role", "mesh", "location"] {
                if let Some(value) = attr_string(&var, attr) {
                    key_attrs.push(format!("{}: {}", attr, value));
                }
            }
            if !key_attrs.is_empty() {
                println!("      - {}", key_attrs.join(", "));
            }
        }
    }

    Ok(())
}

/// Prints a quick min/mean/max summary for a loaded variable.
pub fn print_summary(var_name: &str, units: &str, summary: &CubeSummary) {
    println!("\n Summary for Variable: {}", var_name);
    println!("================================");
    println!("   Units: {}", if units.is_empty() { "(none)" } else { units });
    println!("   Min: {:.4}", summary.min);
    println!("   Max: {:.4}", summary.max);
    println!("   Mean: {:.4}", summary.mean);
    println!("   Valid elements: {} / {}", summary.valid, summary.total);
}
