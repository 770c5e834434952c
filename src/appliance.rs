use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed household appliance set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Appliance {
    Tv,
    Ac,
    Fridge,
    Oven,
    Fan,
    Light,
}

impl Appliance {
    /// Every appliance, in the order user records store them.
    pub const ALL: [Appliance; 6] = [
        Appliance::Tv,
        Appliance::Ac,
        Appliance::Fridge,
        Appliance::Oven,
        Appliance::Fan,
        Appliance::Light,
    ];

    /// Appliances the decision model controls. Fridge is excluded: it is
    /// always ON and never part of the model's output space.
    pub const CONTROLLABLE: [Appliance; 5] = [
        Appliance::Tv,
        Appliance::Ac,
        Appliance::Oven,
        Appliance::Fan,
        Appliance::Light,
    ];

    /// Shedding order for the concurrency-cap repair: the first still-ON
    /// appliance in this list is turned off. Fridge is never shed.
    pub const SHED_PRIORITY: [Appliance; 5] = [
        Appliance::Tv,
        Appliance::Fan,
        Appliance::Light,
        Appliance::Oven,
        Appliance::Ac,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Appliance::Tv => "TV",
            Appliance::Ac => "AC",
            Appliance::Fridge => "Fridge",
            Appliance::Oven => "Oven",
            Appliance::Fan => "Fan",
            Appliance::Light => "Light",
        }
    }

    pub fn from_name(name: &str) -> Option<Appliance> {
        Appliance::ALL.into_iter().find(|a| a.name() == name)
    }

    fn index(self) -> usize {
        match self {
            Appliance::Tv => 0,
            Appliance::Ac => 1,
            Appliance::Fridge => 2,
            Appliance::Oven => 3,
            Appliance::Fan => 4,
            Appliance::Light => 5,
        }
    }
}

impl fmt::Display for Appliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// ON/OFF assignment over the fixed appliance set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplianceStates([bool; 6]);

impl ApplianceStates {
    pub fn all_off() -> Self {
        Self([false; 6])
    }

    pub fn is_on(&self, appliance: Appliance) -> bool {
        self.0[appliance.index()]
    }

    pub fn with(mut self, appliance: Appliance, on: bool) -> Self {
        self.0[appliance.index()] = on;
        self
    }

    pub fn set(&mut self, appliance: Appliance, on: bool) {
        self.0[appliance.index()] = on;
    }

    /// Number of appliances currently ON, Fridge included.
    pub fn on_count(&self) -> usize {
        self.0.iter().filter(|&&on| on).count()
    }
}
