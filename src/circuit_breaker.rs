use failsafe::{backoff, failure_policy, Config, StateMachine};
use std::time::Duration;

/// Consecutive failures before a provider circuit opens.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// How long an open circuit rejects calls before allowing a probe.
pub const OPEN_DURATION: Duration = Duration::from_secs(60);

/// Circuit breaker instance owned by a single provider adapter.
pub type ProviderCircuit =
    StateMachine<failure_policy::ConsecutiveFailures<backoff::Constant>, ()>;

/// Creates a circuit breaker for one external provider.
///
/// # States
///
/// - **CLOSED**: Normal operation, calls pass through.
/// - **OPEN**: Too many consecutive failures, calls are rejected fast.
/// - **HALF_OPEN**: After the open window elapses one probe call is
///   attempted; success closes the circuit and resets the failure count.
///
/// Each adapter owns its own instance; circuits are never shared across
/// adapters, so one flaky source cannot poison another.
pub fn create_provider_circuit_breaker() -> ProviderCircuit {
    create_circuit_breaker_with_open_duration(OPEN_DURATION)
}

/// Same policy with a caller-chosen open window. Used by tests to exercise
/// the recovery path without waiting a full minute.
pub fn create_circuit_breaker_with_open_duration(open_duration: Duration) -> ProviderCircuit {
    let backoff_strategy = backoff::constant(open_duration);
    let failure_policy =
        failure_policy::consecutive_failures(MAX_CONSECUTIVE_FAILURES, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}
