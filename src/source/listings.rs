//! Adoption listing feed.
//!
//! Reads the shelter feed file row by row, in file order. The first line is
//! a header and blank lines are ignored. Each data row becomes either an
//! `AnimalListing` or a `ValidationError` naming the file line, so one bad
//! row never stops the feed.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::Path;

use crate::listing::{AnimalListing, BreedCatalog, Species, parse_posted_at};
use crate::source::csv::split_record;
use crate::utils::error::ValidationError;

/// Name, type, breed, age, color, shelter name, shelter city, shelter state, date posted.
pub const LISTING_COLUMNS: usize = 9;

pub struct ListingSource<R> {
    lines: Lines<R>,
    catalog: BreedCatalog,
    line: u64,
    done: bool,
}

impl ListingSource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>, catalog: BreedCatalog) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file), catalog))
    }
}

impl<R: BufRead> ListingSource<R> {
    pub fn from_reader(reader: R, catalog: BreedCatalog) -> Self {
        Self {
            lines: reader.lines(),
            catalog,
            line: 0,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for ListingSource<R> {
    type Item = Result<AnimalListing, ValidationError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let raw = match self.lines.next() {
                Some(Ok(raw)) => raw,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(ValidationError::Unreadable {
                        line: self.line + 1,
                        reason: e.to_string(),
                    }));
                }
                None => {
                    self.done = true;
                    return None;
                }
            };
            self.line += 1;

            if self.line == 1 || raw.trim().is_empty() {
                continue;
            }
            return Some(parse_listing(self.line, &raw, &self.catalog));
        }
        None
    }
}

fn required<'a>(
    fields: &'a [String],
    index: usize,
    field: &'static str,
    line: u64,
) -> Result<&'a str, ValidationError> {
    let value = fields[index].trim();
    if value.is_empty() {
        return Err(ValidationError::EmptyField { line, field });
    }
    Ok(value)
}

/// Validate one data row. `line` is the 1-based line number in the file.
pub fn parse_listing(
    line: u64,
    raw: &str,
    catalog: &BreedCatalog,
) -> Result<AnimalListing, ValidationError> {
    let fields = split_record(raw);
    if fields.len() < LISTING_COLUMNS {
        return Err(ValidationError::MissingColumns {
            line,
            expected: LISTING_COLUMNS,
            found: fields.len(),
        });
    }

    let name = required(&fields, 0, "name", line)?;
    let species_text = required(&fields, 1, "type", line)?;
    let breed = required(&fields, 2, "breed", line)?;
    let age_text = required(&fields, 3, "age", line)?;
    let color = required(&fields, 4, "color", line)?;
    let shelter_name = required(&fields, 5, "shelter name", line)?;
    let shelter_city = required(&fields, 6, "shelter city", line)?;
    let shelter_state = required(&fields, 7, "shelter state", line)?;
    let posted_text = required(&fields, 8, "date posted", line)?;

    let species: Species = species_text
        .parse()
        .map_err(|_| ValidationError::InvalidField {
            line,
            field: "type",
            value: species_text.to_string(),
        })?;
    let age: u32 = age_text.parse().map_err(|_| ValidationError::InvalidField {
        line,
        field: "age",
        value: age_text.to_string(),
    })?;
    if !catalog.contains(species, breed) {
        return Err(ValidationError::UnknownBreed {
            line,
            species,
            breed: breed.to_string(),
        });
    }
    let posted_at = parse_posted_at(posted_text).map_err(|_| ValidationError::InvalidField {
        line,
        field: "date posted",
        value: posted_text.to_string(),
    })?;

    Ok(AnimalListing {
        name: name.to_string(),
        species,
        breed: breed.to_string(),
        age,
        color: color.to_string(),
        shelter_name: shelter_name.to_string(),
        shelter_city: shelter_city.to_string(),
        shelter_state: shelter_state.to_string(),
        posted_at,
    })
}
