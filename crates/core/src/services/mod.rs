pub mod alert_evaluator;
pub mod alert_repository;
pub mod alert_scheduler;
pub mod format;
pub mod market_service;
pub mod refresh_gate;
pub mod theme_service;
pub mod validation;
