//! Extraction of tainted instructions from the IFDS dataflow reports of Phasar.
//!
//! Phasar's environment variable tracing writes a JSON report of the form
//! ```json
//! [{ "DataFlow": { "main::%3 = call i8* @getenv(...)": { "Facts": [["@getenv", "..."], ...] }, ... } }]
//! ```
//! mapping every instruction to the dataflow facts that hold at it.
//! An instruction is tainted if at least one of its facts stems from the taint source,
//! i.e. if the name of the fact (its first element) contains the source symbol.
//!
//! The extracted list of tainted instructions has the function qualifier of each instruction removed,
//! so that it can be compared with the output of other taint analyses by FileCheck
//! (see the [`filecheck`] module).

pub mod filecheck;

use crate::prelude::*;
use std::path::Path;

/// Name of the environment-read function that acts as the taint source.
pub const ENV_SOURCE_SYMBOL: &str = "getenv";

/// The function qualifier of instructions in the analyzed `main` function.
pub const DEFAULT_INSTRUCTION_PREFIX: &str = "main::";

/// The facts that hold at one instruction.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct InstructionFacts {
    /// The dataflow facts.
    #[serde(rename = "Facts", default)]
    pub facts: Vec<Fact>,
}

/// A single dataflow fact.
///
/// Phasar emits facts as arrays whose first element names the fact.
/// A plain string is accepted as a fact consisting only of its name.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(untagged)]
pub enum Fact {
    /// A fact given by its name followed by further information.
    Tuple(Vec<serde_json::Value>),
    /// A fact given only by its name.
    Name(String),
}

impl Fact {
    /// The name of the fact, if it has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Fact::Tuple(elements) => elements.first().and_then(|first| first.as_str()),
            Fact::Name(name) => Some(name),
        }
    }

    /// Returns `true` if the fact name contains the given source symbol.
    pub fn references(&self, source_symbol: &str) -> bool {
        self.name()
            .map(|name| name.contains(source_symbol))
            .unwrap_or(false)
    }
}

/// The dataflow part of an IFDS report: all instructions with their facts, in report order.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct DataflowReport {
    /// Instruction identifiers and their facts, in the order in which they appear in the report.
    pub instructions: Vec<(String, InstructionFacts)>,
}

impl DataflowReport {
    /// Returns `true` if the report contains no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Parse the dataflow map out of a JSON report.
///
/// Accepted are the array written by Phasar (the first analysis result is used),
/// a single object with a `DataFlow` member, or the bare dataflow map itself.
pub fn parse_dataflow_report(report: serde_json::Value) -> Result<DataflowReport, Error> {
    let analysis_result = match report {
        serde_json::Value::Array(mut results) => {
            if results.is_empty() {
                return Err(anyhow!("The report contains no analysis result"));
            }
            results.swap_remove(0)
        }
        other => other,
    };
    let mut analysis_result = match analysis_result {
        serde_json::Value::Object(map) => map,
        _ => return Err(anyhow!("The analysis result is not a JSON object")),
    };
    let dataflow = match analysis_result.remove("DataFlow") {
        Some(serde_json::Value::Object(dataflow)) => dataflow,
        Some(_) => return Err(anyhow!("The DataFlow member is not a JSON object")),
        None => analysis_result,
    };

    let mut instructions = Vec::with_capacity(dataflow.len());
    for (instruction, facts) in dataflow {
        let facts: InstructionFacts = serde_json::from_value(facts)
            .with_context(|| format!("Malformed facts for instruction {instruction}"))?;
        instructions.push((instruction, facts));
    }
    Ok(DataflowReport { instructions })
}

/// Read and parse the JSON report at the given path.
pub fn read_dataflow_report(path: &Path) -> Result<DataflowReport, Error> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Could not open dataflow report {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("Dataflow report {} is not valid JSON", path.display()))?;
    parse_dataflow_report(json)
}

/// Remove the qualifying prefix from an instruction identifier.
///
/// Identifiers without the prefix are returned unchanged.
pub fn strip_qualifying_prefix<'a>(instruction: &'a str, prefix: &str) -> &'a str {
    instruction.strip_prefix(prefix).unwrap_or(instruction)
}

/// Return the identifiers of all instructions with at least one fact referencing `source_symbol`.
///
/// The qualifying `prefix` is removed from the returned identifiers.
/// The order of the instructions in the report is preserved.
pub fn extract_tainted_instructions(
    report: &DataflowReport,
    source_symbol: &str,
    prefix: &str,
) -> Vec<String> {
    report
        .instructions
        .iter()
        .filter(|(_, facts)| facts.facts.iter().any(|fact| fact.references(source_symbol)))
        .map(|(instruction, _)| strip_qualifying_prefix(instruction, prefix).to_string())
        .collect()
}

/// Join the instructions into newline-terminated lines, the input format expected by FileCheck.
pub fn write_instruction_list(instructions: &[String]) -> String {
    instructions
        .iter()
        .map(|instruction| format!("{instruction}\n"))
        .collect()
}
