//! Generalized Advantage Estimation (GAE) computation
//!
//! Implements GAE from "High-Dimensional Continuous Control Using
//! Generalized Advantage Estimation" (Schulman et al., 2016) over a
//! `[num_steps][num_envs]` trajectory.

/// Compute GAE advantages and bootstrapped returns
///
/// `dones[t][n]` is the done flag observed *before* step `t` was taken, so
/// the flag that cuts the bootstrap after step `t` is `dones[t + 1]`, or
/// `last_dones` for the final step.
///
/// # Arguments
/// * `rewards` - Rewards `[num_steps][num_envs]`
/// * `values` - Value estimates `[num_steps][num_envs]`
/// * `dones` - Pre-step done flags `[num_steps][num_envs]`
/// * `last_values` - Value of the observation after the final step `[num_envs]`
/// * `last_dones` - Done flags after the final step `[num_envs]`
/// * `gamma` - Discount factor
/// * `gae_lambda` - GAE lambda parameter
///
/// # Mathematical Formula
/// ```text
/// δ_t = r_t + γ * V_{t+1} * (1 - d_{t+1}) - V_t
/// A_t = δ_t + γ * λ * (1 - d_{t+1}) * A_{t+1},   A_H = 0
/// R_t = A_t + V_t
/// ```
///
/// # Returns
/// `(advantages, returns)`, both `[num_steps][num_envs]`
pub fn compute_gae(
    rewards: &[Vec<f32>],
    values: &[Vec<f32>],
    dones: &[Vec<bool>],
    last_values: &[f32],
    last_dones: &[bool],
    gamma: f32,
    gae_lambda: f32,
) -> (Vec<Vec<f32>>, Vec<Vec<f32>>) {
    let num_steps = rewards.len();
    let num_envs = last_values.len();

    assert_eq!(values.len(), num_steps, "values length mismatch");
    assert_eq!(dones.len(), num_steps, "dones length mismatch");
    assert_eq!(last_dones.len(), num_envs, "last_dones length mismatch");

    let mut advantages = vec![vec![0.0_f32; num_envs]; num_steps];
    let mut returns = vec![vec![0.0_f32; num_envs]; num_steps];
    let mut last_gae_lam = vec![0.0_f32; num_envs];

    for t in (0..num_steps).rev() {
        for n in 0..num_envs {
            let (next_non_terminal, next_value) = if t == num_steps - 1 {
                (non_terminal(last_dones[n]), last_values[n])
            } else {
                (non_terminal(dones[t + 1][n]), values[t + 1][n])
            };

            let delta = rewards[t][n] + gamma * next_value * next_non_terminal - values[t][n];
            last_gae_lam[n] = delta + gamma * gae_lambda * next_non_terminal * last_gae_lam[n];

            advantages[t][n] = last_gae_lam[n];
            returns[t][n] = last_gae_lam[n] + values[t][n];
        }
    }

    (advantages, returns)
}

fn non_terminal(done: bool) -> f32 {
    if done {
        0.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[f32]]) -> Vec<Vec<f32>> {
        rows.iter().map(|r| r.to_vec()).collect()
    }

    #[test]
    fn test_single_step_terminal_bootstrap() {
        let (adv, ret) = compute_gae(
            &grid(&[&[2.0]]),
            &grid(&[&[0.5]]),
            &[vec![false]],
            &[10.0],
            &[true],
            0.99,
            0.95,
        );
        assert_eq!(adv[0][0], 2.0 - 0.5);
        assert_eq!(ret[0][0], 2.0);
    }

    #[test]
    fn test_lambda_zero_is_one_step_td() {
        let rewards = grid(&[&[1.0], &[0.5], &[2.0]]);
        let values = grid(&[&[0.3], &[0.7], &[0.1]]);
        let dones = vec![vec![false]; 3];
        let gamma = 0.9;

        let (adv, _) = compute_gae(&rewards, &values, &dones, &[0.4], &[false], gamma, 0.0);

        let expected = [
            1.0 + gamma * 0.7 - 0.3,
            0.5 + gamma * 0.1 - 0.7,
            2.0 + gamma * 0.4 - 0.1,
        ];
        for t in 0..3 {
            assert!((adv[t][0] - expected[t]).abs() < 1e-6, "t={t}");
        }
    }

    #[test]
    fn test_gamma_zero_ignores_future() {
        let rewards = grid(&[&[1.0, -1.0], &[0.5, 0.0]]);
        let values = grid(&[&[0.3, 0.2], &[0.7, 0.9]]);
        let dones = vec![vec![false, true], vec![true, false]];

        let (adv, _) = compute_gae(&rewards, &values, &dones, &[5.0, 5.0], &[false, false], 0.0, 0.95);

        for t in 0..2 {
            for n in 0..2 {
                assert_eq!(adv[t][n], rewards[t][n] - values[t][n]);
            }
        }
    }

    #[test]
    fn test_done_cuts_propagation() {
        // Episode boundary before step 1: step 0 must not see step 1's value
        let rewards = grid(&[&[1.0], &[1.0]]);
        let values = grid(&[&[0.0], &[3.0]]);
        let dones = vec![vec![false], vec![true]];

        let (adv, _) = compute_gae(&rewards, &values, &dones, &[0.0], &[false], 0.99, 0.95);
        assert_eq!(adv[0][0], 1.0);
    }

    #[test]
    fn test_return_is_advantage_plus_value() {
        let rewards = grid(&[&[1.0, 0.0], &[0.0, 1.0], &[1.0, 1.0]]);
        let values = grid(&[&[0.5, 0.1], &[0.4, 0.6], &[0.3, 0.3]]);
        let dones = vec![vec![false, false], vec![false, true], vec![true, false]];

        let (adv, ret) = compute_gae(&rewards, &values, &dones, &[0.2, 0.7], &[true, false], 0.99, 0.95);

        for t in 0..3 {
            for n in 0..2 {
                assert_eq!(ret[t][n], adv[t][n] + values[t][n]);
            }
        }
    }

    #[test]
    fn test_reference_trajectory() {
        let rewards = grid(&[&[1.0, 0.0], &[0.0, 1.0], &[1.0, 1.0], &[0.0, 0.0]]);
        let values = grid(&[&[0.5, 0.5], &[0.4, 0.6], &[0.3, 0.3], &[0.2, 0.2]]);
        let dones = vec![vec![false, false]; 4];

        let (adv, ret) =
            compute_gae(&rewards, &values, &dones, &[0.1, 0.1], &[false, false], 0.99, 0.95);

        let expected_adv = [
            [1.5094227, 1.4598227],
            [0.6522304, 1.4522304],
            [0.8030095, 0.8030095],
            [-0.101, -0.101],
        ];
        let expected_ret = [
            [2.0094227, 1.9598227],
            [1.0522304, 2.0522304],
            [1.1030095, 1.1030095],
            [0.099, 0.099],
        ];

        for t in 0..4 {
            for n in 0..2 {
                assert!(
                    (adv[t][n] - expected_adv[t][n]).abs() < 1e-6,
                    "advantage[{t}][{n}] = {}, expected {}",
                    adv[t][n],
                    expected_adv[t][n]
                );
                assert!(
                    (ret[t][n] - expected_ret[t][n]).abs() < 1e-6,
                    "return[{t}][{n}] = {}, expected {}",
                    ret[t][n],
                    expected_ret[t][n]
                );
            }
        }
    }
}
