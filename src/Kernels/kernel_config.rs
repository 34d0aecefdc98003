//! # Kernel Configuration
//!
//! Input schema of the three kernels and the registry of coupled variable names.
//!
//! A kernel block is a JSON object tagged by `"type"`:
//! ```json
//! { "type": "EEDFReaction", "variable": "Ar+", "mean_energy": "mean_en",
//!   "electrons": "em", "target": "Ar", "reaction": "em + Ar -> em + em + Ar+",
//!   "number": "2", "coefficient": 1.0 }
//! ```
//! Required fields missing from a block make deserialization fail, so a broken block
//! never reaches evaluation. Optional fields: `number` (defaults to ""), `use_temp_diff`
//! (false), `target` for energy and reaction kernels (absent means background gas).

use super::kernel_api::{
    KernelError, KernelType, ReactionKernelEnum, build_kernels, kernel_type_by_name,
};
use super::material_fields::FieldLayout;
use super::qp_data::VarId;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticConfig {
    /// energy density variable the kernel acts on
    pub variable: String,
    pub electrons: String,
    pub target: String,
    pub reaction: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub use_temp_diff: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyConfig {
    /// energy density variable the kernel acts on
    pub variable: String,
    pub electrons: String,
    #[serde(default)]
    pub target: Option<String>,
    pub reaction: String,
    #[serde(default)]
    pub number: String,
    pub threshold_energy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionConfig {
    /// species density the kernel acts on
    pub variable: String,
    pub mean_energy: String,
    pub electrons: String,
    #[serde(default)]
    pub target: Option<String>,
    pub reaction: String,
    #[serde(default)]
    pub number: String,
    pub coefficient: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum KernelConfig {
    EEDFElastic(ElasticConfig),
    EEDFEnergy(EnergyConfig),
    EEDFReaction(ReactionConfig),
}

impl KernelConfig {
    /// Reads one kernel block. The `"type"` tag goes through [`kernel_type_by_name`], so
    /// short names (`"elastic"`, `"energy"`, `"reaction"`) are accepted and an unknown type
    /// is reported as such rather than as a schema mismatch.
    pub fn from_json(mut value: serde_json::Value) -> Result<Self, KernelError> {
        let type_name = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| KernelError::UnknownKernelType("<missing \"type\">".to_owned()))?;
        let kernel_type = kernel_type_by_name(type_name)?;
        value["type"] = serde_json::Value::from(kernel_type.name());
        Ok(serde_json::from_value(value)?)
    }

    pub fn kernel_type(&self) -> KernelType {
        match self {
            KernelConfig::EEDFElastic(_) => KernelType::Elastic,
            KernelConfig::EEDFEnergy(_) => KernelType::Energy,
            KernelConfig::EEDFReaction(_) => KernelType::Reaction,
        }
    }

    /// `(reaction, number)` naming the rate coefficient fields.
    pub fn rate_name(&self) -> (&str, &str) {
        match self {
            KernelConfig::EEDFElastic(cfg) => (&cfg.reaction, &cfg.number),
            KernelConfig::EEDFEnergy(cfg) => (&cfg.reaction, &cfg.number),
            KernelConfig::EEDFReaction(cfg) => (&cfg.reaction, &cfg.number),
        }
    }

    pub fn variable(&self) -> &str {
        match self {
            KernelConfig::EEDFElastic(cfg) => &cfg.variable,
            KernelConfig::EEDFEnergy(cfg) => &cfg.variable,
            KernelConfig::EEDFReaction(cfg) => &cfg.variable,
        }
    }
}

/// Names of the nonlinear unknowns and their handles, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableRegistry {
    names: Vec<String>,
    ids: HashMap<String, VarId>,
}

impl VariableRegistry {
    pub fn new(names: &[&str]) -> Self {
        let mut registry = Self::default();
        for name in names {
            registry.add(name);
        }
        registry
    }

    pub fn from_names(names: Vec<String>) -> Self {
        let mut registry = Self::default();
        for name in names {
            registry.add(&name);
        }
        registry
    }

    /// Adds a variable; an existing name keeps its handle.
    pub fn add(&mut self, name: &str) -> VarId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = VarId(self.names.len());
        self.names.push(name.to_owned());
        self.ids.insert(name.to_owned(), id);
        id
    }

    pub fn id(&self, name: &str) -> Result<VarId, KernelError> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| KernelError::UnknownVariable(name.to_owned()))
    }

    pub fn name(&self, id: VarId) -> Option<&str> {
        self.names.get(id.0).map(|s| s.as_str())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A complete input deck: unknowns, provided material fields and kernel blocks.
#[derive(Debug, Clone, Default)]
pub struct KernelDeck {
    pub variables: VariableRegistry,
    pub layout: FieldLayout,
    pub kernels: Vec<KernelConfig>,
}

impl KernelDeck {
    pub fn build(&self) -> Result<Vec<ReactionKernelEnum>, KernelError> {
        let kernels = build_kernels(&self.kernels, &self.variables, &self.layout)?;
        info!(
            "{} kernels built over {} variables and {} material fields",
            kernels.len(),
            self.variables.len(),
            self.layout.len()
        );
        Ok(kernels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_ids_in_order() {
        let mut registry = VariableRegistry::new(&["em", "mean_en", "Ar"]);
        assert_eq!(registry.id("em").unwrap(), VarId(0));
        assert_eq!(registry.id("Ar").unwrap(), VarId(2));
        assert_eq!(registry.add("em"), VarId(0));
        assert_eq!(registry.add("Ar+"), VarId(3));
        assert_eq!(registry.name(VarId(1)), Some("mean_en"));
        assert!(matches!(
            registry.id("Ar*"),
            Err(KernelError::UnknownVariable(name)) if name == "Ar*"
        ));
    }

    #[test]
    fn test_config_defaults() {
        let config = KernelConfig::from_json(json!({
            "type": "EEDFEnergy",
            "variable": "mean_en",
            "electrons": "em",
            "reaction": "em + Ar -> em + Ar*",
            "threshold_energy": -11.5
        }))
        .unwrap();
        match config {
            KernelConfig::EEDFEnergy(cfg) => {
                assert_eq!(cfg.target, None);
                assert_eq!(cfg.number, "");
                assert_eq!(cfg.threshold_energy, -11.5);
            }
            other => panic!("unexpected config {:?}", other),
        }
    }

    #[test]
    fn test_elastic_requires_target() {
        let result = KernelConfig::from_json(json!({
            "type": "EEDFElastic",
            "variable": "mean_en",
            "electrons": "em",
            "reaction": "em + Ar -> em + Ar"
        }));
        assert!(matches!(result, Err(KernelError::Config(_))));
    }

    #[test]
    fn test_reaction_requires_coefficient() {
        let result = KernelConfig::from_json(json!({
            "type": "EEDFReaction",
            "variable": "Ar+",
            "mean_energy": "mean_en",
            "electrons": "em",
            "reaction": "em + Ar -> em + em + Ar+"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result = KernelConfig::from_json(json!({
            "type": "EEDFMomentum",
            "variable": "mean_en"
        }));
        assert!(matches!(result, Err(KernelError::UnknownKernelType(name)) if name == "EEDFMomentum"));
        let result = KernelConfig::from_json(json!({"variable": "mean_en"}));
        assert!(matches!(result, Err(KernelError::UnknownKernelType(_))));
    }

    #[test]
    fn test_short_type_names() {
        let config = KernelConfig::from_json(json!({
            "type": "reaction",
            "variable": "Ar+",
            "mean_energy": "mean_en",
            "electrons": "em",
            "reaction": "ionization",
            "number": "2",
            "coefficient": 1.0
        }))
        .unwrap();
        assert_eq!(config.kernel_type(), KernelType::Reaction);
        assert_eq!(config.rate_name(), ("ionization", "2"));
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["type"], "EEDFReaction");
    }

    #[test]
    fn test_config_serde_keeps_tag() {
        let config = KernelConfig::EEDFElastic(ElasticConfig {
            variable: "mean_en".to_string(),
            electrons: "em".to_string(),
            target: "Ar".to_string(),
            reaction: "elastic".to_string(),
            number: "0".to_string(),
            use_temp_diff: true,
        });
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["type"], "EEDFElastic");
        assert_eq!(KernelConfig::from_json(value).unwrap(), config);
        assert_eq!(config.variable(), "mean_en");
    }
}
