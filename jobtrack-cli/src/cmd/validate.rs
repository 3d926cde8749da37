use std::path::Path;

use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::plan::{JobPlan, PlanError};
use crate::OutputArgs;

#[derive(Serialize)]
struct ValidateResult {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stages: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

pub async fn validate_cmd(path: &Path, output: OutputArgs) -> i32 {
    match JobPlan::load(path) {
        Ok((plan, format)) => {
            let result = ValidateResult {
                valid: true,
                format: Some(format!("{format:?}")),
                stages: Some(plan.stages.len()),
                errors: vec![],
            };
            if output.format == OutputFormat::Text && !output.quiet {
                println!(
                    "ok: valid job plan `{}` ({} stages, {format:?})",
                    plan.name,
                    plan.stages.len()
                );
            } else {
                print_result(output.format, output.quiet, &result);
            }
            exit_codes::SUCCESS
        }
        Err(err @ PlanError::Io { .. }) => {
            print_error(output.format, output.quiet, &err.to_string());
            exit_codes::RUNTIME_ERROR
        }
        Err(PlanError::Invalid(errors)) => {
            if output.format == OutputFormat::Text && !output.quiet {
                eprintln!("error: validation failed");
                for e in &errors {
                    eprintln!("- {e}");
                }
            } else {
                let result = ValidateResult {
                    valid: false,
                    format: None,
                    stages: None,
                    errors,
                };
                print_result(output.format, output.quiet, &result);
            }
            exit_codes::VALIDATION_FAILED
        }
        Err(err) => {
            print_error(output.format, output.quiet, &err.to_string());
            exit_codes::VALIDATION_FAILED
        }
    }
}
