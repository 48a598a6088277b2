use std::path::PathBuf;
use std::sync::Once;

use bevy::prelude::*;
use meander_sim::{build_headless_app, SpawnRequests};

static INIT: Once = Once::new();

pub fn ensure_test_config() {
    INIT.call_once(|| {
        let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("test_river_config.json");

        debug_assert!(
            config_path.exists(),
            "missing test river config at {}",
            config_path.display()
        );

        std::env::set_var(meander_sim::config::RIVER_CONFIG_ENV, &config_path);
    });
}

/// Headless app with a fixed set of springs queued for the first tick.
pub fn app_with_springs(positions: &[Vec3]) -> App {
    ensure_test_config();
    let mut app = build_headless_app();
    {
        let mut requests = app.world.resource_mut::<SpawnRequests>();
        for position in positions {
            requests.push(*position);
        }
    }
    app
}

pub fn spring_layout() -> Vec<Vec3> {
    vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(6.0, 0.0, 1.0),
        Vec3::new(2.0, 0.0, 7.0),
        Vec3::new(9.0, 0.0, 9.0),
    ]
}
