//! Substance definitions and registry

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::{TransitionKind, TransitionRule, TransmutationRule};

/// Built-in substance IDs
pub struct SubstanceId;

impl SubstanceId {
    pub const AIR: u16 = 0;
    pub const STONE: u16 = 1;
    pub const WATER: u16 = 2;
    pub const ICE: u16 = 3;
    pub const STEAM: u16 = 4;
    pub const LAVA: u16 = 5;
    pub const OBSIDIAN: u16 = 6;
    pub const WOOD: u16 = 7;
    pub const SMOKE: u16 = 8;
    pub const OIL: u16 = 9;
    pub const DIRT: u16 = 10;
    pub const MUD: u16 = 11;
}

/// Physical phase of a substance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Doesn't move (stone, wood, ice)
    Solid,
    /// Flows down and sideways one mote at a time (water, lava, oil)
    Liquid,
    /// Rises until capped (steam, smoke)
    Gas,
}

/// Definition of a substance's properties
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Substance {
    pub id: u16,
    pub name: String,
    pub phase: Phase,

    /// Base color (RGBA), for meshing collaborators
    pub color: [u8; 4],

    // Combustion
    pub flammable: bool,
    /// Burn() calls before a fire on this substance goes out
    pub burn_time: u32,
    /// Temperature above which the combustion pass ignites this substance
    pub ignition_temperature: Option<f32>,

    // Phase mirroring for the water cycle
    /// Liquid this gas condenses into
    pub liquid_form: Option<u16>,
    /// Gas this liquid evaporates into
    pub gas_form: Option<u16>,

    /// Temperature-driven transitions, evaluated in order
    pub transitions: Vec<TransitionRule>,
    /// Contact-driven transmutations, evaluated in declaration order
    pub transmutations: Vec<TransmutationRule>,
}

impl Default for Substance {
    fn default() -> Self {
        Self {
            id: 0,
            name: "unknown".to_string(),
            phase: Phase::Solid,
            color: [255, 0, 255, 255], // Magenta for missing substances
            flammable: false,
            burn_time: 0,
            ignition_temperature: None,
            liquid_form: None,
            gas_form: None,
            transitions: Vec::new(),
            transmutations: Vec::new(),
        }
    }
}

impl Substance {
    pub fn is_liquid(&self) -> bool {
        self.phase == Phase::Liquid
    }

    pub fn is_gas(&self) -> bool {
        self.phase == Phase::Gas
    }

    /// Flammable with a non-zero burn duration
    pub fn is_burnable(&self) -> bool {
        self.flammable && self.burn_time > 0
    }
}

/// Configuration errors detected while building a registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("substance id {0} registered twice")]
    DuplicateId(u16),

    #[error("substance ids must be dense from 0, missing id {0}")]
    SparseIds(u16),

    #[error("id 0 must be a gas named \"air\"")]
    MissingAir,

    #[error("substance {substance} references unknown {field} id {target}")]
    DanglingReference {
        substance: String,
        field: &'static str,
        target: u16,
    },

    #[error("substance {0} has a transmutation producing itself")]
    SelfTransmutation(String),

    #[error("substance {0} has a transition producing itself")]
    SelfTransition(String),

    #[error("rule added to unregistered substance id {0}")]
    UnknownRuleOwner(u16),

    #[error("substance {substance}: {field} must point at a {expected:?} substance")]
    PhaseMismatch {
        substance: String,
        field: &'static str,
        expected: Phase,
    },

    #[error("failed to parse substance catalog: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Collects substances and validates them into a registry
#[derive(Default)]
pub struct SubstanceRegistryBuilder {
    substances: Vec<Substance>,
    /// Ids that received rules before being registered
    orphan_rules: Vec<u16>,
}

impl SubstanceRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preloaded with the built-in catalog
    pub fn with_defaults() -> Self {
        let mut builder = Self::new();
        builder.register_defaults();
        builder
    }

    pub fn register(&mut self, substance: Substance) -> &mut Self {
        self.substances.push(substance);
        self
    }

    /// Append a transmutation rule to an already registered substance
    pub fn add_transmutation(&mut self, id: u16, rule: TransmutationRule) -> &mut Self {
        match self.substances.iter_mut().find(|s| s.id == id) {
            Some(substance) => substance.transmutations.push(rule),
            None => self.orphan_rules.push(id),
        }
        self
    }

    /// Append a transition rule to an already registered substance
    pub fn add_transition(&mut self, id: u16, rule: TransitionRule) -> &mut Self {
        match self.substances.iter_mut().find(|s| s.id == id) {
            Some(substance) => substance.transitions.push(rule),
            None => self.orphan_rules.push(id),
        }
        self
    }

    /// Validate and freeze the catalog
    pub fn build(self) -> Result<SubstanceRegistry, RegistryError> {
        if let Some(&id) = self.orphan_rules.first() {
            return Err(RegistryError::UnknownRuleOwner(id));
        }
        let mut substances = self.substances;
        substances.sort_by_key(|s| s.id);

        for pair in substances.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(RegistryError::DuplicateId(pair[0].id));
            }
        }
        for (index, substance) in substances.iter().enumerate() {
            if substance.id as usize != index {
                return Err(RegistryError::SparseIds(index as u16));
            }
        }

        match substances.first() {
            Some(air) if air.name == "air" && air.phase == Phase::Gas => {}
            _ => return Err(RegistryError::MissingAir),
        }

        let count = substances.len();
        let phase_of = |id: u16| substances.get(id as usize).map(|s| s.phase);

        for substance in &substances {
            let dangling = |field: &'static str, target: u16| RegistryError::DanglingReference {
                substance: substance.name.clone(),
                field,
                target,
            };

            if let Some(liquid) = substance.liquid_form {
                match phase_of(liquid) {
                    None => return Err(dangling("liquid_form", liquid)),
                    Some(Phase::Liquid) => {}
                    Some(_) => {
                        return Err(RegistryError::PhaseMismatch {
                            substance: substance.name.clone(),
                            field: "liquid_form",
                            expected: Phase::Liquid,
                        });
                    }
                }
            }

            if let Some(gas) = substance.gas_form {
                match phase_of(gas) {
                    None => return Err(dangling("gas_form", gas)),
                    Some(Phase::Gas) => {}
                    Some(_) => {
                        return Err(RegistryError::PhaseMismatch {
                            substance: substance.name.clone(),
                            field: "gas_form",
                            expected: Phase::Gas,
                        });
                    }
                }
            }

            for rule in &substance.transitions {
                if rule.product as usize >= count {
                    return Err(dangling("transition product", rule.product));
                }
                if rule.product == substance.id {
                    return Err(RegistryError::SelfTransition(substance.name.clone()));
                }
            }

            for rule in &substance.transmutations {
                if rule.trigger as usize >= count {
                    return Err(dangling("transmutation trigger", rule.trigger));
                }
                if rule.product as usize >= count {
                    return Err(dangling("transmutation product", rule.product));
                }
                if rule.product == substance.id {
                    return Err(RegistryError::SelfTransmutation(substance.name.clone()));
                }
            }
        }

        log::debug!("Substance registry built with {} substances", count);

        Ok(SubstanceRegistry { substances })
    }

    fn register_defaults(&mut self) {
        // Air (empty space)
        self.register(Substance {
            id: SubstanceId::AIR,
            name: "air".to_string(),
            phase: Phase::Gas,
            color: [0, 0, 0, 0], // Transparent
            ..Default::default()
        });

        // Stone
        self.register(Substance {
            id: SubstanceId::STONE,
            name: "stone".to_string(),
            phase: Phase::Solid,
            color: [128, 128, 128, 255],
            transitions: vec![TransitionRule::new(
                TransitionKind::Melt,
                1200.0,
                SubstanceId::LAVA,
            )],
            ..Default::default()
        });

        // Water
        self.register(Substance {
            id: SubstanceId::WATER,
            name: "water".to_string(),
            phase: Phase::Liquid,
            color: [64, 164, 223, 200],
            gas_form: Some(SubstanceId::STEAM),
            transitions: vec![
                TransitionRule::new(TransitionKind::Freeze, 0.0, SubstanceId::ICE),
                TransitionRule::new(TransitionKind::Evaporate, 100.0, SubstanceId::STEAM),
            ],
            transmutations: vec![TransmutationRule::new(
                SubstanceId::LAVA,
                SubstanceId::STEAM,
            )],
            ..Default::default()
        });

        // Ice
        self.register(Substance {
            id: SubstanceId::ICE,
            name: "ice".to_string(),
            phase: Phase::Solid,
            color: [200, 230, 255, 200],
            transitions: vec![TransitionRule::new(
                TransitionKind::Melt,
                0.0,
                SubstanceId::WATER,
            )],
            ..Default::default()
        });

        // Steam - condenses only when chilled, clouds rely on the water cycle
        self.register(Substance {
            id: SubstanceId::STEAM,
            name: "steam".to_string(),
            phase: Phase::Gas,
            color: [200, 200, 200, 100],
            liquid_form: Some(SubstanceId::WATER),
            transitions: vec![TransitionRule::new(
                TransitionKind::Condense,
                10.0,
                SubstanceId::WATER,
            )],
            ..Default::default()
        });

        // Lava
        self.register(Substance {
            id: SubstanceId::LAVA,
            name: "lava".to_string(),
            phase: Phase::Liquid,
            color: [255, 80, 0, 255],
            transitions: vec![TransitionRule::new(
                TransitionKind::Freeze,
                700.0,
                SubstanceId::STONE,
            )],
            transmutations: vec![TransmutationRule::new(
                SubstanceId::WATER,
                SubstanceId::OBSIDIAN,
            )],
            ..Default::default()
        });

        // Obsidian
        self.register(Substance {
            id: SubstanceId::OBSIDIAN,
            name: "obsidian".to_string(),
            phase: Phase::Solid,
            color: [30, 20, 40, 255],
            ..Default::default()
        });

        // Wood
        self.register(Substance {
            id: SubstanceId::WOOD,
            name: "wood".to_string(),
            phase: Phase::Solid,
            color: [139, 90, 43, 255],
            flammable: true,
            burn_time: 12,
            ignition_temperature: Some(300.0),
            ..Default::default()
        });

        // Smoke
        self.register(Substance {
            id: SubstanceId::SMOKE,
            name: "smoke".to_string(),
            phase: Phase::Gas,
            color: [60, 60, 60, 150],
            ..Default::default()
        });

        // Oil
        self.register(Substance {
            id: SubstanceId::OIL,
            name: "oil".to_string(),
            phase: Phase::Liquid,
            color: [50, 40, 30, 255],
            flammable: true,
            burn_time: 6,
            ignition_temperature: Some(200.0),
            ..Default::default()
        });

        // Dirt
        self.register(Substance {
            id: SubstanceId::DIRT,
            name: "dirt".to_string(),
            phase: Phase::Solid,
            color: [101, 67, 33, 255],
            transmutations: vec![TransmutationRule::new(SubstanceId::WATER, SubstanceId::MUD)],
            ..Default::default()
        });

        // Mud
        self.register(Substance {
            id: SubstanceId::MUD,
            name: "mud".to_string(),
            phase: Phase::Solid,
            color: [70, 50, 30, 255],
            ..Default::default()
        });
    }
}

/// Immutable catalog of all substances, indexed by id
#[derive(Debug)]
pub struct SubstanceRegistry {
    substances: Vec<Substance>,
}

impl SubstanceRegistry {
    /// Registry holding the built-in catalog
    pub fn with_defaults() -> Result<Self, RegistryError> {
        SubstanceRegistryBuilder::with_defaults().build()
    }

    /// Parse a RON list of substances and validate it
    pub fn from_ron(source: &str) -> Result<Self, RegistryError> {
        let substances: Vec<Substance> = ron::from_str(source)?;
        let mut builder = SubstanceRegistryBuilder::new();
        for substance in substances {
            builder.register(substance);
        }
        builder.build()
    }

    /// Serialize the catalog back to RON
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(&self.substances, ron::ser::PrettyConfig::default())
    }

    /// Get substance definition by ID, falling back to air for unknown ids
    pub fn get(&self, id: u16) -> &Substance {
        self.substances
            .get(id as usize)
            .unwrap_or(&self.substances[0])
    }

    /// Get substance definition by ID if it exists
    pub fn try_get(&self, id: u16) -> Option<&Substance> {
        self.substances.get(id as usize)
    }

    pub fn contains(&self, id: u16) -> bool {
        (id as usize) < self.substances.len()
    }

    /// Look up an id by substance name
    pub fn find_by_name(&self, name: &str) -> Option<u16> {
        self.substances
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.id)
    }

    pub fn phase(&self, id: u16) -> Phase {
        self.get(id).phase
    }

    pub fn is_liquid(&self, id: u16) -> bool {
        id != SubstanceId::AIR && self.get(id).is_liquid()
    }

    /// Gas other than air
    pub fn is_gas(&self, id: u16) -> bool {
        id != SubstanceId::AIR && self.get(id).is_gas()
    }

    pub fn len(&self) -> usize {
        self.substances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Substance> {
        self.substances.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn air() -> Substance {
        Substance {
            id: SubstanceId::AIR,
            name: "air".to_string(),
            phase: Phase::Gas,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_catalog_is_valid() {
        let registry = SubstanceRegistry::with_defaults().unwrap();
        assert_eq!(registry.len(), 12);
        assert_eq!(registry.get(SubstanceId::WATER).name, "water");
        assert_eq!(registry.get(SubstanceId::STEAM).liquid_form, Some(SubstanceId::WATER));
        assert_eq!(registry.get(SubstanceId::WATER).gas_form, Some(SubstanceId::STEAM));
        assert!(registry.get(SubstanceId::WOOD).is_burnable());
    }

    #[test]
    fn test_unknown_id_falls_back_to_air() {
        let registry = SubstanceRegistry::with_defaults().unwrap();
        assert_eq!(registry.get(999).id, SubstanceId::AIR);
        assert!(registry.try_get(999).is_none());
    }

    #[test]
    fn test_air_is_not_a_gas_for_flow() {
        let registry = SubstanceRegistry::with_defaults().unwrap();
        assert!(!registry.is_gas(SubstanceId::AIR));
        assert!(registry.is_gas(SubstanceId::STEAM));
        assert!(registry.is_liquid(SubstanceId::LAVA));
    }

    #[test]
    fn test_find_by_name() {
        let registry = SubstanceRegistry::with_defaults().unwrap();
        assert_eq!(registry.find_by_name("smoke"), Some(SubstanceId::SMOKE));
        assert_eq!(registry.find_by_name("plasma"), None);
    }

    #[test]
    fn test_rejects_self_transmutation() {
        let mut builder = SubstanceRegistryBuilder::new();
        builder.register(air()).register(Substance {
            id: 1,
            name: "slime".to_string(),
            transmutations: vec![TransmutationRule::new(0, 1)],
            ..Default::default()
        });

        assert!(matches!(
            builder.build(),
            Err(RegistryError::SelfTransmutation(name)) if name == "slime"
        ));
    }

    #[test]
    fn test_rejects_dangling_product() {
        let mut builder = SubstanceRegistryBuilder::new();
        builder.register(air()).register(Substance {
            id: 1,
            name: "rock".to_string(),
            transitions: vec![TransitionRule::new(TransitionKind::Melt, 10.0, 42)],
            ..Default::default()
        });

        assert!(matches!(
            builder.build(),
            Err(RegistryError::DanglingReference { target: 42, .. })
        ));
    }

    #[test]
    fn test_rejects_sparse_and_duplicate_ids() {
        let mut sparse = SubstanceRegistryBuilder::new();
        sparse.register(air()).register(Substance {
            id: 5,
            name: "gap".to_string(),
            ..Default::default()
        });
        assert!(matches!(sparse.build(), Err(RegistryError::SparseIds(1))));

        let mut duplicate = SubstanceRegistryBuilder::new();
        duplicate.register(air()).register(air());
        assert!(matches!(duplicate.build(), Err(RegistryError::DuplicateId(0))));
    }

    #[test]
    fn test_rejects_missing_air() {
        let mut builder = SubstanceRegistryBuilder::new();
        builder.register(Substance {
            id: 0,
            name: "stone".to_string(),
            ..Default::default()
        });
        assert!(matches!(builder.build(), Err(RegistryError::MissingAir)));
    }

    #[test]
    fn test_rejects_gas_form_that_is_not_gas() {
        let mut builder = SubstanceRegistryBuilder::new();
        builder
            .register(air())
            .register(Substance {
                id: 1,
                name: "brine".to_string(),
                phase: Phase::Liquid,
                gas_form: Some(2),
                ..Default::default()
            })
            .register(Substance {
                id: 2,
                name: "salt".to_string(),
                phase: Phase::Solid,
                ..Default::default()
            });

        assert!(matches!(
            builder.build(),
            Err(RegistryError::PhaseMismatch { field: "gas_form", .. })
        ));
    }

    #[test]
    fn test_add_transmutation_appends_in_order() {
        let mut builder = SubstanceRegistryBuilder::with_defaults();
        builder.add_transmutation(
            SubstanceId::DIRT,
            TransmutationRule::new(SubstanceId::LAVA, SubstanceId::OBSIDIAN),
        );
        let registry = builder.build().unwrap();

        let rules = &registry.get(SubstanceId::DIRT).transmutations;
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].trigger, SubstanceId::WATER);
        assert_eq!(rules[1].trigger, SubstanceId::LAVA);
    }

    #[test]
    fn test_rules_for_unregistered_id_fail_build() {
        let mut builder = SubstanceRegistryBuilder::with_defaults();
        builder.add_transition(
            42,
            TransitionRule::new(TransitionKind::Melt, 10.0, SubstanceId::WATER),
        );
        assert!(matches!(
            builder.build(),
            Err(RegistryError::UnknownRuleOwner(42))
        ));

        let mut builder = SubstanceRegistryBuilder::with_defaults();
        builder.add_transmutation(
            77,
            TransmutationRule::new(SubstanceId::WATER, SubstanceId::MUD),
        );
        assert!(matches!(
            builder.build(),
            Err(RegistryError::UnknownRuleOwner(77))
        ));
    }

    #[test]
    fn test_ron_round_trip_of_catalog() {
        let registry = SubstanceRegistry::with_defaults().unwrap();
        let text = registry.to_ron().unwrap();
        let reloaded = SubstanceRegistry::from_ron(&text).unwrap();

        assert_eq!(reloaded.len(), registry.len());
        assert_eq!(reloaded.get(SubstanceId::LAVA).transmutations.len(), 1);
    }

    #[test]
    fn test_ron_parse_error_is_reported() {
        assert!(matches!(
            SubstanceRegistry::from_ron("[ (id: "),
            Err(RegistryError::Parse(_))
        ));
    }
}
