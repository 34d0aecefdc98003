//! # Material Fields
//!
//! Kernels never look material properties up by name while evaluating. The field provider
//! declares every property it computes in a [`FieldLayout`]; a kernel resolves the
//! [`FieldKey`]s it needs once, at construction, into [`FieldHandle`]s, and at each quadrature
//! point reads plain numbers from a [`FieldValues`] laid out by the same layout.
//!
//! Field names follow the usual naming of EEDF rate materials:
//!
//! | Key | Name |
//! |-----|------|
//! | rate coefficient | `k{number}_{reaction}` |
//! | its derivative w.r.t. mean energy | `d_k{number}_d_en_{reaction}` |
//! | species mass | `mass{species}` |
//! | species temperature | `T{species}` |
//! | elementary charge | `e` |
//! | Boltzmann constant | `k_boltz` |
//!
//! The reaction number is optional and only disambiguates several rate coefficients
//! belonging to one lumped reaction. It must be a decimal index: `ka_ionization` could not
//! be told apart from a reaction named `a_ionization`. A reaction named `boltz` without a
//! number collides with the Boltzmann constant. [`FieldKey::check_rate_names`] rejects both.

use super::kernel_api::KernelError;
use super::qp_data::CoupledValues;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static DERIVATIVE_NAME: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^d_k(\d*)_d_en_(.+)$"));
static RATE_NAME: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^k(\d*)_(.+)$"));
static MASS_NAME: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^mass(.+)$"));
static TEMPERATURE_NAME: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^T(.+)$"));

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    RateCoefficient { reaction: String, number: String },
    RateEnergyDerivative { reaction: String, number: String },
    SpeciesMass(String),
    SpeciesTemperature(String),
    ElementaryCharge,
    Boltzmann,
}

impl FieldKey {
    pub fn rate(reaction: &str, number: &str) -> Self {
        FieldKey::RateCoefficient {
            reaction: reaction.to_owned(),
            number: number.to_owned(),
        }
    }

    pub fn rate_derivative(reaction: &str, number: &str) -> Self {
        FieldKey::RateEnergyDerivative {
            reaction: reaction.to_owned(),
            number: number.to_owned(),
        }
    }

    /// Fails when the rate field names of `reaction`/`number` do not read back as the same
    /// keys, so kernels built from code accept exactly what a deck file can declare.
    pub fn check_rate_names(reaction: &str, number: &str) -> Result<(), KernelError> {
        for key in [
            FieldKey::rate(reaction, number),
            FieldKey::rate_derivative(reaction, number),
        ] {
            let name = key.to_string();
            if name.parse::<FieldKey>()? != key {
                return Err(KernelError::FieldNameParse(name));
            }
        }
        Ok(())
    }

    pub fn mass(species: &str) -> Self {
        FieldKey::SpeciesMass(species.to_owned())
    }

    pub fn temperature(species: &str) -> Self {
        FieldKey::SpeciesTemperature(species.to_owned())
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::RateCoefficient { reaction, number } => write!(f, "k{}_{}", number, reaction),
            FieldKey::RateEnergyDerivative { reaction, number } => {
                write!(f, "d_k{}_d_en_{}", number, reaction)
            }
            FieldKey::SpeciesMass(species) => write!(f, "mass{}", species),
            FieldKey::SpeciesTemperature(species) => write!(f, "T{}", species),
            FieldKey::ElementaryCharge => write!(f, "e"),
            FieldKey::Boltzmann => write!(f, "k_boltz"),
        }
    }
}

impl FromStr for FieldKey {
    type Err = KernelError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let name = name.trim();
        // constants first: "k_boltz" would otherwise read as the rate of a reaction "boltz"
        match name {
            "e" => return Ok(FieldKey::ElementaryCharge),
            "k_boltz" => return Ok(FieldKey::Boltzmann),
            _ => {}
        }
        let parse_err = |_: &regex::Error| KernelError::FieldNameParse(name.to_owned());
        let derivative = DERIVATIVE_NAME.as_ref().map_err(parse_err)?;
        let rate = RATE_NAME.as_ref().map_err(parse_err)?;
        let mass = MASS_NAME.as_ref().map_err(parse_err)?;
        let temperature = TEMPERATURE_NAME.as_ref().map_err(parse_err)?;

        if let Some(caps) = derivative.captures(name) {
            return Ok(FieldKey::rate_derivative(&caps[2], &caps[1]));
        }
        if let Some(caps) = rate.captures(name) {
            return Ok(FieldKey::rate(&caps[2], &caps[1]));
        }
        if let Some(caps) = mass.captures(name) {
            return Ok(FieldKey::mass(&caps[1]));
        }
        if let Some(caps) = temperature.captures(name) {
            return Ok(FieldKey::temperature(&caps[1]));
        }
        Err(KernelError::FieldNameParse(name.to_owned()))
    }
}

/// Direct index of a declared field inside [`FieldValues`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldHandle(pub(crate) usize);

/// Registry of the fields a provider computes. Built once, shared read-only.
#[derive(Debug, Clone, Default)]
pub struct FieldLayout {
    keys: Vec<FieldKey>,
    index: HashMap<FieldKey, FieldHandle>,
}

impl FieldLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field; declaring the same key twice returns the existing handle.
    pub fn declare(&mut self, key: FieldKey) -> FieldHandle {
        if let Some(handle) = self.index.get(&key) {
            return *handle;
        }
        let handle = FieldHandle(self.keys.len());
        self.keys.push(key.clone());
        self.index.insert(key, handle);
        handle
    }

    /// Declares a field given by its provider name, e.g. `"d_k2_d_en_ionization"`.
    pub fn declare_name(&mut self, name: &str) -> Result<FieldHandle, KernelError> {
        let key = name.parse::<FieldKey>()?;
        Ok(self.declare(key))
    }

    pub fn resolve(&self, key: &FieldKey) -> Result<FieldHandle, KernelError> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| KernelError::MissingField(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.keys.iter()
    }
}

/// Field values at one quadrature point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldValues {
    values: Vec<f64>,
}

impl FieldValues {
    pub fn new(layout: &FieldLayout) -> Self {
        Self {
            values: vec![0.0; layout.len()],
        }
    }

    #[inline]
    pub fn get(&self, handle: FieldHandle) -> f64 {
        self.values[handle.0]
    }

    pub fn set(&mut self, handle: FieldHandle, value: f64) {
        self.values[handle.0] = value;
    }

    pub fn set_key(
        &mut self,
        layout: &FieldLayout,
        key: &FieldKey,
        value: f64,
    ) -> Result<(), KernelError> {
        let handle = layout.resolve(key)?;
        self.set(handle, value);
        Ok(())
    }
}

/// Rate coefficient as a function of electron mean energy (eV per electron).
pub trait RateFieldProvider {
    /// Returns `(k, dk/d(mean energy))`.
    fn rate_and_derivative(&self, mean_energy: f64) -> (f64, f64);
}

/// Fills the material fields of a point from the coupled unknowns at that point.
pub trait FieldProvider {
    fn compute_qp_properties(&self, vars: &CoupledValues, out: &mut FieldValues);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate_names() {
        let key: FieldKey = "k1_em + Ar -> em + Ar*".parse().unwrap();
        assert_eq!(key, FieldKey::rate("em + Ar -> em + Ar*", "1"));
        let key: FieldKey = "k_elastic".parse().unwrap();
        assert_eq!(key, FieldKey::rate("elastic", ""));
        let key: FieldKey = "d_k12_d_en_ionization".parse().unwrap();
        assert_eq!(key, FieldKey::rate_derivative("ionization", "12"));
    }

    #[test]
    fn test_parse_constants_and_species() {
        assert_eq!("e".parse::<FieldKey>().unwrap(), FieldKey::ElementaryCharge);
        assert_eq!("k_boltz".parse::<FieldKey>().unwrap(), FieldKey::Boltzmann);
        assert_eq!("massAr".parse::<FieldKey>().unwrap(), FieldKey::mass("Ar"));
        assert_eq!("TAr".parse::<FieldKey>().unwrap(), FieldKey::temperature("Ar"));
        assert!("velocity".parse::<FieldKey>().is_err());
    }

    #[test]
    fn test_names_survive_display() {
        let keys = vec![
            FieldKey::rate("excitation", "3"),
            FieldKey::rate_derivative("excitation", ""),
            FieldKey::mass("Ar"),
            FieldKey::temperature("Ar"),
            FieldKey::ElementaryCharge,
            FieldKey::Boltzmann,
        ];
        for key in keys {
            assert_eq!(key.to_string().parse::<FieldKey>().unwrap(), key);
        }
    }

    #[test]
    fn test_rate_names_must_read_back() {
        assert!(FieldKey::check_rate_names("ionization", "2").is_ok());
        assert!(FieldKey::check_rate_names("em + Ar -> em + Ar*", "").is_ok());
        // non-decimal index
        let err = FieldKey::check_rate_names("ionization", "a").unwrap_err();
        assert!(matches!(err, KernelError::FieldNameParse(name) if name == "ka_ionization"));
        assert!("ka_ionization".parse::<FieldKey>().is_err());
        // collides with the Boltzmann constant
        let err = FieldKey::check_rate_names("boltz", "").unwrap_err();
        assert!(matches!(err, KernelError::FieldNameParse(name) if name == "k_boltz"));
        assert!(FieldKey::check_rate_names("boltz", "1").is_ok());
    }

    #[test]
    fn test_layout_declare_is_idempotent() {
        let mut layout = FieldLayout::new();
        let a = layout.declare(FieldKey::mass("Ar"));
        let b = layout.declare_name("massAr").unwrap();
        assert_eq!(a, b);
        assert_eq!(layout.len(), 1);
        let missing = layout.resolve(&FieldKey::Boltzmann);
        assert!(matches!(missing, Err(KernelError::MissingField(name)) if name == "k_boltz"));
    }

    #[test]
    fn test_field_values_set_key() {
        let mut layout = FieldLayout::new();
        let handle = layout.declare(FieldKey::ElementaryCharge);
        let mut values = FieldValues::new(&layout);
        values
            .set_key(&layout, &FieldKey::ElementaryCharge, 1.602e-19)
            .unwrap();
        assert_eq!(values.get(handle), 1.602e-19);
        assert!(values.set_key(&layout, &FieldKey::Boltzmann, 1.0).is_err());
    }
}
