use crate::domain::{GridConnection, RegionConfig};

/// Built-in three-region network used when no regions are configured.
pub fn default_region_configs() -> Vec<RegionConfig> {
    vec![
        RegionConfig::new("Japan", 50_000.0, 52_000.0, 15_000.0)
            .with_connection(GridConnection::new("Korea", 2_000.0, 0.07))
            .with_connection(GridConnection::new("EU", 1_200.0, 0.12)),
        RegionConfig::new("Korea", 35_000.0, 37_000.0, 10_000.0)
            .with_connection(GridConnection::new("Japan", 2_000.0, 0.07))
            .with_connection(GridConnection::new("EU", 1_500.0, 0.1)),
        RegionConfig::new("EU", 60_000.0, 64_000.0, 25_000.0)
            .with_connection(GridConnection::new("Japan", 1_200.0, 0.12))
            .with_connection(GridConnection::new("Korea", 1_500.0, 0.1)),
    ]
}
