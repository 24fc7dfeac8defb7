use std::sync::Arc;

use vlt_controller::{BalanceController, ControllerConfig};
use vlt_store::MemoryStore;

fn quiet_config() -> ControllerConfig {
    ControllerConfig {
        auto_regen: false,
        ..ControllerConfig::default()
    }
}

#[test]
fn set_balance_normalizes_before_saving() {
    let ctrl = BalanceController::new(Arc::new(MemoryStore::new()), quiet_config());

    assert_eq!(ctrl.set_balance(-5.0).unwrap(), 0);
    assert_eq!(ctrl.set_balance(3.9).unwrap(), 3);
    assert_eq!(ctrl.set_balance(f64::NAN).unwrap(), 0);
    assert_eq!(ctrl.set_balance(250.0).unwrap(), 250);

    // Each normalized value was actually persisted, not just returned.
    assert_eq!(ctrl.balance(), 250);
    assert!(ctrl.verify_integrity());
}

#[test]
fn normalized_value_round_trips_through_init() {
    let store = Arc::new(MemoryStore::new());
    let writer = BalanceController::new(store.clone(), quiet_config());
    writer.set_balance(19.99).unwrap();

    let ctrl = BalanceController::new(store, quiet_config());
    assert_eq!(ctrl.init().unwrap(), 19);
}
