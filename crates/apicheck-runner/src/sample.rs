//! Uniform selection from server-returned lists

use rand::Rng;
use rand::seq::SliceRandom;

use apicheck_core::ScenarioError;

/// Pick one element uniformly at random.
///
/// `what` names the list in the setup failure raised when it is empty.
///
/// # Errors
///
/// Returns [`ScenarioError::Setup`] for an empty list.
pub fn sample_uniform<'a, T, R>(items: &'a [T], rng: &mut R, what: &str) -> Result<&'a T, ScenarioError>
where
    R: Rng + ?Sized,
{
    items
        .choose(rng)
        .ok_or_else(|| ScenarioError::Setup(format!("{what} is empty, nothing to sample")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use apicheck_core::FailureKind;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn empty_list_is_setup_failure() {
        let mut rng = SmallRng::seed_from_u64(1);
        let err = sample_uniform::<i64, _>(&[], &mut rng, "idList for gender=female").unwrap_err();
        assert_eq!(err.kind(), FailureKind::SetupFailure);
        assert!(err.to_string().contains("gender=female"));
    }

    #[test]
    fn single_element_always_chosen() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..10 {
            assert_eq!(*sample_uniform(&[42], &mut rng, "ids").unwrap(), 42);
        }
    }

    #[test]
    fn same_seed_same_choice() {
        let ids: Vec<i64> = (1..=50).collect();
        let a = sample_uniform(&ids, &mut SmallRng::seed_from_u64(99), "ids").unwrap();
        let b = sample_uniform(&ids, &mut SmallRng::seed_from_u64(99), "ids").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn every_element_reachable() {
        let ids = [1, 2, 3, 4];
        let mut rng = SmallRng::seed_from_u64(3);
        let mut seen = [false; 4];
        for _ in 0..400 {
            let id = sample_uniform(&ids, &mut rng, "ids").unwrap();
            seen[usize::try_from(*id - 1).unwrap()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    proptest! {
        #[test]
        fn sample_is_member(ids in prop::collection::vec(any::<i64>(), 1..64), seed in any::<u64>()) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let id = sample_uniform(&ids, &mut rng, "ids").unwrap();
            prop_assert!(ids.contains(id));
        }
    }
}
