//! Operator interest selection.
//!
//! Runs over any `BufRead`/`Write` pair so the dialogue can be driven from a
//! terminal or from a test script. Invalid answers re-prompt; end of input
//! means the operator walked away.

use std::io::{BufRead, Write};

use crate::listing::{AnimalListing, BreedCatalog, Species, queue_name};
use crate::utils::error::ConsumerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
    pub species: Species,
    pub breed: String,
}

impl Interest {
    pub fn queue(&self) -> String {
        queue_name(self.species)
    }

    pub fn matches(&self, listing: &AnimalListing) -> bool {
        listing.species == self.species && listing.breed == self.breed
    }
}

fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> Result<String, ConsumerError> {
    write!(output, "{question}")?;
    output.flush()?;
    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        return Err(ConsumerError::UserCancellation);
    }
    Ok(answer.trim().to_string())
}

pub fn select_interest<R: BufRead, W: Write>(
    catalog: &BreedCatalog,
    input: &mut R,
    output: &mut W,
) -> Result<Interest, ConsumerError> {
    loop {
        let answer = prompt(input, output, "Are you interested in a dog or a cat today? ")?;
        let Ok(species) = answer.parse::<Species>() else {
            writeln!(output, "Please enter 'dog' or 'cat'.")?;
            continue;
        };
        let label = species.as_str().to_lowercase();
        let breeds = catalog.breeds(species);
        if breeds.is_empty() {
            writeln!(output, "No {label} breeds are available right now.")?;
            continue;
        }

        writeln!(output, "\nSelect a {label} breed from the list below:")?;
        for (position, breed) in breeds.iter().enumerate() {
            writeln!(output, "{}. {breed}", position + 1)?;
        }

        loop {
            let answer = prompt(input, output, "Enter the number corresponding to your choice: ")?;
            let Ok(selection) = answer.parse::<usize>() else {
                writeln!(output, "Invalid input. Please enter a numeric value.")?;
                continue;
            };
            match catalog.resolve(species, selection) {
                Some(breed) => {
                    writeln!(output, "You have selected: {breed}")?;
                    return Ok(Interest {
                        species,
                        breed: breed.to_string(),
                    });
                }
                None => writeln!(
                    output,
                    "Please enter a number between 1 and {}.",
                    breeds.len()
                )?,
            }
        }
    }
}
