//! Scenario tests exercising the ECS modules together

mod gameplay;
