//! Forward Euler integration for stateful blocks.

/// One forward Euler step: `x(n+1) = x(n) + dt * dx`.
#[inline]
pub fn forward_euler(state: f64, dt: f64, derivative: f64) -> f64 {
    state + dt * derivative
}

/// Integrate `derivative` into every state, from the last index to the first.
pub fn integrate_states(states: &mut [f64], dt: f64, derivative: f64) {
    for state in states.iter_mut().rev() {
        *state = forward_euler(*state, dt, derivative);
    }
}
