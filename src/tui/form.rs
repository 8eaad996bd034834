//! Form state for the terminal UI.
//!
//! Everything here is pure state manipulation so it can be tested without a
//! terminal. The form owns the fuel label table: users pick a description, and
//! only the matching dataset code is put into the `VehicleSpec`.

use crate::domain::{Feature, NumericField, VehicleSpec};
use crate::encoders::EncoderRegistry;

/// A fuel choice as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuelOption {
    pub label: &'static str,
    pub code: &'static str,
}

/// Display label → dataset fuel code.
pub const FUEL_OPTIONS: [FuelOption; 5] = [
    FuelOption {
        label: "Regular Gasoline (X)",
        code: "X",
    },
    FuelOption {
        label: "Premium Gasoline (Z)",
        code: "Z",
    },
    FuelOption {
        label: "Diesel (D)",
        code: "D",
    },
    FuelOption {
        label: "Ethanol (E) - E85",
        code: "E",
    },
    FuelOption {
        label: "Natural Gas (N)",
        code: "N",
    },
];

pub fn fuel_code_for_label(label: &str) -> Option<&'static str> {
    FUEL_OPTIONS.iter().find(|o| o.label == label).map(|o| o.code)
}

pub fn fuel_label_for_code(code: &str) -> Option<&'static str> {
    FUEL_OPTIONS.iter().find(|o| o.code == code).map(|o| o.label)
}

/// Form rows, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Make,
    VehicleClass,
    Transmission,
    FuelType,
    EngineSize,
    Cylinders,
    FuelCombined,
}

impl FormField {
    pub const ALL: [FormField; 7] = [
        FormField::Make,
        FormField::VehicleClass,
        FormField::Transmission,
        FormField::FuelType,
        FormField::EngineSize,
        FormField::Cylinders,
        FormField::FuelCombined,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Make => "Make",
            FormField::VehicleClass => "Vehicle class",
            FormField::Transmission => "Transmission",
            FormField::FuelType => "Fuel type",
            FormField::EngineSize => "Engine size (L)",
            FormField::Cylinders => "Cylinders",
            FormField::FuelCombined => "Fuel consumption (L/100 km)",
        }
    }

    /// The numeric domain behind this row, if it is a numeric row.
    pub fn numeric(self) -> Option<NumericField> {
        match self {
            FormField::EngineSize => Some(NumericField::EngineSize),
            FormField::Cylinders => Some(NumericField::Cylinders),
            FormField::FuelCombined => Some(NumericField::FuelCombined),
            _ => None,
        }
    }
}

/// Current values of every form row.
#[derive(Debug, Clone)]
pub struct FormState {
    makes: Vec<String>,
    classes: Vec<String>,
    transmissions: Vec<String>,
    make_idx: usize,
    class_idx: usize,
    transmission_idx: usize,
    fuel_idx: usize,
    engine_size: f64,
    cylinders: u32,
    fuel_comb: f64,
    selected: usize,
}

impl FormState {
    /// Populate selection lists from the registry; numeric rows start at
    /// 2.0 L / 4 cylinders / 8.5 L/100 km.
    pub fn new(registry: &EncoderRegistry) -> Self {
        Self {
            makes: registry.categories_for(Feature::Make).to_vec(),
            classes: registry.categories_for(Feature::VehicleClass).to_vec(),
            transmissions: registry.categories_for(Feature::Transmission).to_vec(),
            make_idx: 0,
            class_idx: 0,
            transmission_idx: 0,
            fuel_idx: 0,
            engine_size: 2.0,
            cylinders: 4,
            fuel_comb: 8.5,
            selected: 0,
        }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn field(&self) -> FormField {
        FormField::ALL[self.selected]
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < FormField::ALL.len() {
            self.selected += 1;
        }
    }

    /// Step the selected row by `delta`: cycle selections, or move numeric
    /// values by one increment, clamped to the row's domain.
    pub fn adjust(&mut self, delta: i32) {
        match self.field() {
            FormField::Make => self.make_idx = cycle(self.make_idx, self.makes.len(), delta),
            FormField::VehicleClass => {
                self.class_idx = cycle(self.class_idx, self.classes.len(), delta)
            }
            FormField::Transmission => {
                self.transmission_idx = cycle(self.transmission_idx, self.transmissions.len(), delta)
            }
            FormField::FuelType => self.fuel_idx = cycle(self.fuel_idx, FUEL_OPTIONS.len(), delta),
            FormField::EngineSize => {
                self.engine_size = step_tenths(self.engine_size, delta, NumericField::EngineSize)
            }
            FormField::Cylinders => {
                let (min, max) = NumericField::Cylinders.domain();
                let next = (i64::from(self.cylinders) + i64::from(delta)).clamp(min as i64, max as i64);
                self.cylinders = next as u32;
            }
            FormField::FuelCombined => {
                self.fuel_comb = step_tenths(self.fuel_comb, delta, NumericField::FuelCombined)
            }
        }
    }

    /// Jump the selected list row to the next entry starting with `c`
    /// (case-insensitive). Returns false when nothing matches.
    pub fn jump_to_prefix(&mut self, c: char) -> bool {
        let c = c.to_ascii_uppercase();
        let (items, idx): (Vec<&str>, &mut usize) = match self.field() {
            FormField::Make => (self.makes.iter().map(String::as_str).collect(), &mut self.make_idx),
            FormField::VehicleClass => {
                (self.classes.iter().map(String::as_str).collect(), &mut self.class_idx)
            }
            FormField::Transmission => (
                self.transmissions.iter().map(String::as_str).collect(),
                &mut self.transmission_idx,
            ),
            FormField::FuelType => (FUEL_OPTIONS.iter().map(|o| o.label).collect(), &mut self.fuel_idx),
            _ => return false,
        };

        let n = items.len();
        for offset in 1..=n {
            let candidate = (*idx + offset) % n;
            if items[candidate]
                .chars()
                .next()
                .is_some_and(|first| first.to_ascii_uppercase() == c)
            {
                *idx = candidate;
                return true;
            }
        }
        false
    }

    /// Set a numeric row from typed text. Values outside the domain are
    /// rejected rather than clamped so the user sees what happened.
    pub fn set_numeric(&mut self, field: FormField, text: &str) -> Result<(), String> {
        let Some(numeric) = field.numeric() else {
            return Err(format!("{} is not a numeric field", field.label()));
        };
        let text = text.trim();
        let value: f64 = text
            .parse()
            .map_err(|_| format!("'{text}' is not a number"))?;
        if !numeric.contains(value) {
            let (min, max) = numeric.domain();
            return Err(format!("{} must be between {min} and {max}", field.label()));
        }

        match field {
            FormField::EngineSize => self.engine_size = value,
            FormField::FuelCombined => self.fuel_comb = value,
            FormField::Cylinders => {
                if value.fract() != 0.0 {
                    return Err("Cylinders must be a whole number".to_string());
                }
                self.cylinders = value as u32;
            }
            _ => {}
        }
        Ok(())
    }

    /// Display value of a row.
    pub fn value_text(&self, field: FormField) -> String {
        match field {
            FormField::Make => pick(&self.makes, self.make_idx).to_string(),
            FormField::VehicleClass => pick(&self.classes, self.class_idx).to_string(),
            FormField::Transmission => pick(&self.transmissions, self.transmission_idx).to_string(),
            FormField::FuelType => FUEL_OPTIONS[self.fuel_idx].label.to_string(),
            FormField::EngineSize => format!("{:.1}", self.engine_size),
            FormField::Cylinders => self.cylinders.to_string(),
            FormField::FuelCombined => format!("{:.1}", self.fuel_comb),
        }
    }

    /// The record handed to the pipeline.
    pub fn to_spec(&self) -> VehicleSpec {
        VehicleSpec {
            make: pick(&self.makes, self.make_idx).to_string(),
            vehicle_class: pick(&self.classes, self.class_idx).to_string(),
            transmission: pick(&self.transmissions, self.transmission_idx).to_string(),
            fuel_type_code: FUEL_OPTIONS[self.fuel_idx].code.to_string(),
            engine_size_liters: self.engine_size,
            cylinder_count: self.cylinders,
            fuel_combined: self.fuel_comb,
        }
    }
}

fn pick(items: &[String], idx: usize) -> &str {
    items.get(idx).map(String::as_str).unwrap_or("")
}

fn cycle(idx: usize, len: usize, delta: i32) -> usize {
    if len == 0 {
        return 0;
    }
    let len = len as i64;
    (idx as i64 + i64::from(delta)).rem_euclid(len) as usize
}

/// Step by 0.1 and snap to one decimal so repeated steps do not drift.
fn step_tenths(value: f64, delta: i32, field: NumericField) -> f64 {
    let (min, max) = field.domain();
    let next = ((value * 10.0).round() + f64::from(delta)) / 10.0;
    next.clamp(min, max)
}
