//! Named groups of interchangeable sounds
//!
//! A group plays one random member at a time ("hit" → hit1..hit4).

use rand::Rng;

use super::AudioError;

/// An ordered, non-empty set of sound ids treated as one logical sound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundGroup {
    name: String,
    members: Vec<String>,
}

impl SoundGroup {
    /// Build a group from explicit members
    pub fn new<I, S>(name: impl Into<String>, members: I) -> Result<Self, AudioError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let members: Vec<String> = members.into_iter().map(Into::into).collect();
        if members.is_empty() {
            return Err(AudioError::EmptyGroup(name));
        }
        Ok(Self { name, members })
    }

    /// Group following the `prefix1..prefixN` asset naming convention
    pub fn numbered(prefix: &str, count: usize) -> Result<Self, AudioError> {
        Self::new(prefix, (1..=count).map(|i| format!("{prefix}{i}")))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; construction rejects empty groups
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Pick one member uniformly at random
    pub fn pick<R: Rng>(&self, rng: &mut R) -> &str {
        let index = rng.random_range(0..self.members.len());
        &self.members[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_numbered_group_members() {
        let group = SoundGroup::numbered("hit", 4).unwrap();
        assert_eq!(group.name(), "hit");
        assert_eq!(group.members(), ["hit1", "hit2", "hit3", "hit4"]);
    }

    #[test]
    fn test_empty_group_rejected() {
        let err = SoundGroup::numbered("hit", 0).unwrap_err();
        assert!(matches!(err, AudioError::EmptyGroup(ref name) if name == "hit"));

        let err = SoundGroup::new("none", Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, AudioError::EmptyGroup(_)));
    }

    #[test]
    fn test_pick_reaches_every_member() {
        let group = SoundGroup::numbered("step", 3).unwrap();
        let mut rng = Pcg32::seed_from_u64(7);
        let mut seen = [false; 3];
        for _ in 0..200 {
            let id = group.pick(&mut rng);
            let index = group.members().iter().position(|m| m == id).unwrap();
            seen[index] = true;
        }
        assert!(seen.iter().all(|s| *s), "every member should come up: {seen:?}");
    }

    proptest! {
        #[test]
        fn pick_stays_inside_group(count in 1usize..32, seed in any::<u64>()) {
            let group = SoundGroup::numbered("sfx", count).unwrap();
            let mut rng = Pcg32::seed_from_u64(seed);
            let id = group.pick(&mut rng);
            let n: usize = id.trim_start_matches("sfx").parse().unwrap();
            prop_assert!((1..=count).contains(&n));
        }
    }
}
