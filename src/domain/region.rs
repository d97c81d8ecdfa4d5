use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{ensure_fraction, ensure_non_negative, GridError, Result};

fn default_loss_factor() -> f64 {
    0.05
}

fn default_storage_efficiency() -> f64 {
    0.9
}

/// Directed interconnection declared by the region that can reach `target_region`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConnection {
    pub target_region: String,
    pub capacity_mw: f64,
    /// Fraction of transferred power lost in transit, in [0, 1)
    #[serde(default = "default_loss_factor")]
    pub loss_factor: f64,
}

impl GridConnection {
    pub fn new(target_region: impl Into<String>, capacity_mw: f64, loss_factor: f64) -> Self {
        Self {
            target_region: target_region.into(),
            capacity_mw,
            loss_factor,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("capacity_mw", self.capacity_mw)?;
        ensure_non_negative("loss_factor", self.loss_factor)?;
        if self.loss_factor >= 1.0 {
            return Err(GridError::invalid(
                "loss_factor",
                self.loss_factor,
                "must be below 1",
            ));
        }
        Ok(())
    }
}

/// Static identity and physical limits of one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    pub base_demand_mw: f64,
    pub base_generation_mw: f64,
    pub storage_capacity_mwh: f64,
    /// Round-trip efficiency
    #[serde(default = "default_storage_efficiency")]
    pub storage_efficiency: f64,
    #[serde(default)]
    pub grid_connections: Vec<GridConnection>,
}

impl RegionConfig {
    pub fn new(
        name: impl Into<String>,
        base_demand_mw: f64,
        base_generation_mw: f64,
        storage_capacity_mwh: f64,
    ) -> Self {
        Self {
            name: name.into(),
            base_demand_mw,
            base_generation_mw,
            storage_capacity_mwh,
            storage_efficiency: default_storage_efficiency(),
            grid_connections: Vec::new(),
        }
    }

    pub fn with_connection(mut self, connection: GridConnection) -> Self {
        self.grid_connections.push(connection);
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("base_demand_mw", self.base_demand_mw)?;
        ensure_non_negative("base_generation_mw", self.base_generation_mw)?;
        ensure_non_negative("storage_capacity_mwh", self.storage_capacity_mwh)?;
        ensure_fraction("storage_efficiency", self.storage_efficiency)?;
        for connection in &self.grid_connections {
            connection.validate()?;
        }
        Ok(())
    }
}

/// Incoming connections keyed by the receiving region.
///
/// Each entry's `target_region` names the *sending* region.
pub type IncomingConnections = BTreeMap<String, Vec<GridConnection>>;

/// Turn "I can reach X" declarations into "X can be fed by me" entries.
///
/// A connection A -> B with capacity C becomes an entry under B whose
/// `target_region` is A. Per-target ordering follows the order of `regions`
/// and then each region's declaration order.
pub fn invert_connections<'a, I>(regions: I) -> IncomingConnections
where
    I: IntoIterator<Item = &'a RegionConfig>,
{
    let mut incoming = IncomingConnections::new();
    for region in regions {
        for connection in &region.grid_connections {
            incoming
                .entry(connection.target_region.clone())
                .or_default()
                .push(GridConnection {
                    target_region: region.name.clone(),
                    capacity_mw: connection.capacity_mw,
                    loss_factor: connection.loss_factor,
                });
        }
    }
    incoming
}

/// Ordered, name-unique set of validated region configurations.
#[derive(Debug, Clone, Default)]
pub struct RegionRegistry {
    regions: Vec<RegionConfig>,
}

impl RegionRegistry {
    /// Validate every region and every connection endpoint.
    pub fn new(regions: impl IntoIterator<Item = RegionConfig>) -> Result<Self> {
        let regions: Vec<RegionConfig> = regions.into_iter().collect();

        let mut names = HashSet::with_capacity(regions.len());
        for region in &regions {
            if !names.insert(region.name.as_str()) {
                return Err(GridError::DuplicateRegion(region.name.clone()));
            }
        }

        for region in &regions {
            region.validate()?;
            for connection in &region.grid_connections {
                if !names.contains(connection.target_region.as_str()) {
                    return Err(GridError::UnknownRegion {
                        region: connection.target_region.clone(),
                        referenced_by: region.name.clone(),
                    });
                }
            }
        }

        Ok(Self { regions })
    }

    pub fn get(&self, name: &str) -> Option<&RegionConfig> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionConfig> {
        self.regions.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.regions.iter().map(|r| r.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn incoming_connections(&self) -> IncomingConnections {
        invert_connections(&self.regions)
    }
}
