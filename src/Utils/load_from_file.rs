use crate::Kernels::kernel_api::KernelError;
use crate::Kernels::kernel_config::{KernelConfig, KernelDeck, VariableRegistry};
use crate::Kernels::material_fields::FieldLayout;
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub struct LoadData {
    pub file_name: String,
}

impl LoadData {
    pub fn new(file_name: String) -> Self {
        LoadData { file_name }
    }
    pub fn load_deck(&self) -> Result<KernelDeck, KernelError> {
        load_and_validate_deck(&self.file_name)
    }
    pub fn load_variables(&self) -> Result<Vec<String>, KernelError> {
        let lines = read_lines(&self.file_name)?;
        parse_section(&self.file_name, &lines, &["VARIABLES", "UNKNOWNS"])
    }
}

fn read_lines(file_name: &str) -> Result<Vec<String>, KernelError> {
    let path = Path::new(file_name);
    if !path.exists() {
        return Err(KernelError::InputFile(format!(
            "File '{}' does not exist",
            file_name
        )));
    }
    let reader = BufReader::new(File::open(path)?);
    Ok(reader.lines().map_while(Result::ok).collect())
}

/// Finds the block under one of `headers`: from the line after the header to the next
/// all-uppercase line or the end of file. Returns the index of the first line and the text.
fn find_section(
    file_name: &str,
    lines: &[String],
    headers: &[&str],
) -> Result<(usize, String), KernelError> {
    let start_index = lines
        .iter()
        .position(|line| {
            let trimmed = line.trim().to_uppercase();
            headers.iter().any(|h| trimmed == *h)
        })
        .map(|i| i + 1)
        .ok_or_else(|| {
            KernelError::InputFile(format!(
                "No '{}' header found in file '{}'",
                headers[0], file_name
            ))
        })?;

    let end_index = lines[start_index..]
        .iter()
        .position(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && trimmed.chars().all(|c| c.is_uppercase() || c == '_')
        })
        .map(|i| start_index + i)
        .unwrap_or(lines.len());

    Ok((start_index, lines[start_index..end_index].join("\n")))
}

/// Parses one JSON section; on failure logs the offending line with a pointer to the column.
fn parse_section<T: DeserializeOwned>(
    file_name: &str,
    lines: &[String],
    headers: &[&str],
) -> Result<T, KernelError> {
    let (start_index, section) = find_section(file_name, lines, headers)?;
    match serde_json::from_str::<T>(&section) {
        Ok(data) => {
            info!(
                "Successfully parsed section '{}' from file '{}'",
                headers[0], file_name
            );
            Ok(data)
        }
        Err(e) => {
            let error_line = e.line();
            let error_column = e.column();
            // serde_json counts lines from 1; 0 means the position is unknown
            let actual_line = start_index + error_line.max(1) - 1;
            error!(
                "Error parsing section '{}' at line {}, column {} (line {} in file '{}'): {}",
                headers[0],
                error_line,
                error_column,
                actual_line + 1,
                file_name,
                e
            );
            if let Some(problem_line) = lines.get(actual_line) {
                error!("Problematic line: {}", problem_line);
                if error_column >= 1 && error_column <= problem_line.len() {
                    error!("{}", " ".repeat(error_column - 1) + "^");
                }
            }
            Err(KernelError::Config(e))
        }
    }
}

/// Reads a sectioned input deck:
/// ```text
/// VARIABLES
/// ["em", "mean_en", "Ar"]
/// FIELDS
/// ["k_elastic", "d_k_d_en_elastic", "massAr"]
/// KERNELS
/// [{"type": "EEDFElastic", "variable": "mean_en", ...}]
/// ```
pub fn load_deck_from_file(file_name: &str) -> Result<KernelDeck, KernelError> {
    let lines = read_lines(file_name)?;
    let variables: Vec<String> = parse_section(file_name, &lines, &["VARIABLES", "UNKNOWNS"])?;
    let fields: Vec<String> = parse_section(file_name, &lines, &["FIELDS", "MATERIAL_FIELDS"])?;
    let blocks: Vec<serde_json::Value> = parse_section(file_name, &lines, &["KERNELS"])?;
    let kernels = blocks
        .into_iter()
        .enumerate()
        .map(|(i, block)| {
            KernelConfig::from_json(block)
                .inspect_err(|e| error!("Kernel block {} in file '{}': {}", i, file_name, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut layout = FieldLayout::new();
    for name in &fields {
        layout.declare_name(name)?;
    }
    Ok(KernelDeck {
        variables: VariableRegistry::from_names(variables),
        layout,
        kernels,
    })
}

/// Loads a deck and checks it for things that are legal but likely unintended.
pub fn load_and_validate_deck(file_name: &str) -> Result<KernelDeck, KernelError> {
    let deck = load_deck_from_file(file_name)?;
    if deck.variables.is_empty() {
        return Err(KernelError::InputFile(format!(
            "No variables declared in file '{}'",
            file_name
        )));
    }
    if deck.kernels.is_empty() {
        warn!("Loaded deck '{}' contains no kernels", file_name);
    }
    let acting_on: HashSet<&str> = deck.kernels.iter().map(|k| k.variable()).collect();
    for name in deck.variables.names() {
        if !acting_on.contains(name.as_str()) {
            warn!("No kernel acts on variable '{}'", name);
        }
    }
    info!(
        "Loaded deck '{}': {} variables, {} fields, {} kernels",
        file_name,
        deck.variables.len(),
        deck.layout.len(),
        deck.kernels.len()
    );
    Ok(deck)
}
