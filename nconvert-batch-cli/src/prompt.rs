//! Interactive architecture prompt.

use dialoguer::Input;
use nconvert_batch::manager::{parse_choice, Architecture, ArchitectureSelector};
use tracing::warn;

/// Asks on the terminal which build to install.
///
/// Empty input accepts the detected architecture; invalid input is
/// rejected and asked again. If the terminal goes away the detected
/// architecture is used.
pub struct PromptSelector;

impl ArchitectureSelector for PromptSelector {
    fn select(&self, detected: Architecture) -> Architecture {
        println!("Detected architecture: {}", detected);
        println!("  [1] x64 (64-bit)");
        println!("  [2] x32 (32-bit)");

        let answer = Input::<String>::new()
            .with_prompt(format!("Select architecture (Enter for {})", detected))
            .allow_empty(true)
            .validate_with(|input: &String| -> Result<(), &'static str> {
                match parse_choice(input, detected) {
                    Some(_) => Ok(()),
                    None => Err("Enter 1, 2, x64 or x32"),
                }
            })
            .interact_text();

        match answer {
            Ok(text) => parse_choice(&text, detected).unwrap_or(detected),
            Err(e) => {
                warn!(error = %e, "Architecture prompt failed, using detected");
                detected
            }
        }
    }
}
