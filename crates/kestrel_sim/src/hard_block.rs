//! Registry of behavioural models for hard blocks.
//!
//! A hard-block node is bound to a model by the part of its name after the
//! first `.`: a node called `top^mac.dsp_mult~0` uses the model registered
//! as `dsp_mult`. Models are plain trait objects, so a host application can
//! register closures or stateful structs.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use kestrel_common::Logic;
use kestrel_netlist::names;

use crate::error::SimError;

/// Computes a hard block's outputs for one cycle.
///
/// Called once per node per cycle, possibly from several threads for
/// different nodes sharing one model.
pub trait HardBlockModel: Send + Sync {
    /// Fills `outputs` from `inputs`. `outputs` starts out all `X`.
    fn evaluate(&self, cycle: i64, inputs: &[Logic], outputs: &mut [Logic]);
}

impl<F> HardBlockModel for F
where
    F: Fn(i64, &[Logic], &mut [Logic]) + Send + Sync,
{
    fn evaluate(&self, cycle: i64, inputs: &[Logic], outputs: &mut [Logic]) {
        self(cycle, inputs, outputs)
    }
}

/// Named hard-block models available to a simulation.
#[derive(Clone, Default)]
pub struct HardBlockRegistry {
    models: HashMap<String, Arc<dyn HardBlockModel>>,
}

impl HardBlockRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `model` under `name`, replacing any previous model.
    pub fn register(&mut self, name: impl Into<String>, model: impl HardBlockModel + 'static) {
        self.models.insert(name.into(), Arc::new(model));
    }

    /// Finds the model for the node called `node_name`.
    pub fn resolve(&self, node_name: &str) -> Result<Arc<dyn HardBlockModel>, SimError> {
        let model = names::hard_block_model(node_name).ok_or_else(|| SimError::HardBlock {
            node: node_name.to_string(),
            reason: "name does not carry a model after '.'".to_string(),
        })?;
        self.models
            .get(model)
            .cloned()
            .ok_or_else(|| SimError::HardBlock {
                node: node_name.to_string(),
                reason: format!("no model registered as '{model}'"),
            })
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if no model is registered.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl fmt::Debug for HardBlockRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.models.keys().collect();
        names.sort();
        f.debug_struct("HardBlockRegistry").field("models", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invert(_: i64, inputs: &[Logic], outputs: &mut [Logic]) {
        for (o, i) in outputs.iter_mut().zip(inputs) {
            *o = !*i;
        }
    }

    #[test]
    fn resolves_by_suffix_after_dot() {
        let mut registry = HardBlockRegistry::new();
        registry.register("inv", invert);
        let model = registry.resolve("top^blk.inv~3").unwrap();
        let mut out = [Logic::X; 2];
        model.evaluate(0, &[Logic::One, Logic::Zero], &mut out);
        assert_eq!(out, [Logic::Zero, Logic::One]);
    }

    #[test]
    fn missing_model_is_an_error() {
        let registry = HardBlockRegistry::new();
        let err = registry.resolve("top^blk.fir").err().unwrap();
        assert_eq!(
            err.to_string(),
            "hard block 'top^blk.fir': no model registered as 'fir'"
        );
    }

    #[test]
    fn name_without_dot_is_an_error() {
        let mut registry = HardBlockRegistry::new();
        registry.register("inv", invert);
        assert!(matches!(
            registry.resolve("top^blk"),
            Err(SimError::HardBlock { .. })
        ));
    }

    #[test]
    fn debug_lists_names() {
        let mut registry = HardBlockRegistry::new();
        registry.register("b", invert);
        registry.register("a", invert);
        assert_eq!(format!("{registry:?}"), r#"HardBlockRegistry { models: ["a", "b"] }"#);
        assert_eq!(registry.len(), 2);
    }
}
