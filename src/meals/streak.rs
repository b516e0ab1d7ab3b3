//! Diet-compliance statistics over one user's meal history.
//!
//! The input must already be in creation order; it is never re-sorted here.
//! Owner filtering happens upstream in the repository query.

use super::repo_types::Meal;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MealSummary {
    pub total_meals: usize,
    pub total_inside_diet: usize,
    pub total_outside_diet: usize,
    /// Longest run of consecutive inside-diet meals; the earliest run wins a tie.
    pub best_streak: Vec<Meal>,
}

pub fn summarize(meals: &[Meal]) -> MealSummary {
    let mut inside = 0;
    let mut run_start = 0;
    let mut run_len = 0;
    let mut best_start = 0;
    let mut best_len = 0;

    for (i, meal) in meals.iter().enumerate() {
        if meal.inside_diet {
            inside += 1;
            if run_len == 0 {
                run_start = i;
            }
            run_len += 1;
        } else {
            run_len = 0;
        }

        // strictly greater: a later run of equal length never replaces the first
        if run_len > best_len {
            best_start = run_start;
            best_len = run_len;
        }
    }

    MealSummary {
        total_meals: meals.len(),
        total_inside_diet: inside,
        total_outside_diet: meals.len() - inside,
        best_streak: meals[best_start..best_start + best_len].to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use time::{Duration, OffsetDateTime};
    use uuid::Uuid;

    fn meals(flags: &[bool]) -> Vec<Meal> {
        let owner_id = Uuid::new_v4();
        let base = OffsetDateTime::now_utc();
        flags
            .iter()
            .enumerate()
            .map(|(i, &inside_diet)| Meal {
                id: Uuid::new_v4(),
                owner_id,
                name: format!("meal {i}"),
                description: None,
                inside_diet,
                created_at: base + Duration::minutes(i as i64),
                updated_at: None,
            })
            .collect()
    }

    const IN: bool = true;
    const OUT: bool = false;

    #[test]
    fn empty_input() {
        assert_eq!(summarize(&[]), MealSummary::default());
    }

    #[test]
    fn no_inside_diet_meals() {
        let input = meals(&[OUT, OUT, OUT]);
        let s = summarize(&input);
        assert_eq!(s.total_meals, 3);
        assert_eq!(s.total_inside_diet, 0);
        assert_eq!(s.total_outside_diet, 3);
        assert!(s.best_streak.is_empty());
    }

    #[test]
    fn all_inside_diet_meals() {
        let input = meals(&[IN; 5]);
        let s = summarize(&input);
        assert_eq!(s.best_streak, input);
        assert_eq!(s.total_outside_diet, 0);
    }

    #[test]
    fn first_longest_run_wins_ties() {
        let input = meals(&[IN, IN, OUT, IN, IN]);
        let s = summarize(&input);
        assert_eq!(s.best_streak, input[0..2].to_vec());
    }

    #[test]
    fn mixed_history() {
        let input = meals(&[IN, OUT, IN, IN, IN, OUT, IN, IN]);
        let s = summarize(&input);
        assert_eq!(s.total_meals, 8);
        assert_eq!(s.total_inside_diet, 6);
        assert_eq!(s.total_outside_diet, 2);
        assert_eq!(s.best_streak, input[2..5].to_vec());
    }

    #[test]
    fn single_outside_meal_resets_progress() {
        let input = meals(&[IN, IN, OUT, IN, IN, IN]);
        assert_eq!(summarize(&input).best_streak, input[3..6].to_vec());
    }

    #[test]
    fn input_order_is_trusted() {
        // reversed timestamps, streak still follows slice order
        let mut input = meals(&[IN, OUT, IN, IN]);
        input.reverse();
        let s = summarize(&input);
        assert_eq!(s.best_streak, input[0..2].to_vec());
    }

    proptest! {
        #[test]
        fn counts_add_up(flags in proptest::collection::vec(any::<bool>(), 0..64)) {
            let input = meals(&flags);
            let s = summarize(&input);
            prop_assert_eq!(s.total_meals, flags.len());
            prop_assert_eq!(s.total_meals, s.total_inside_diet + s.total_outside_diet);
            prop_assert!(s.best_streak.len() <= s.total_inside_diet);
        }

        #[test]
        fn streak_is_contiguous_inside_window(flags in proptest::collection::vec(any::<bool>(), 0..64)) {
            let input = meals(&flags);
            let s = summarize(&input);
            prop_assert!(s.best_streak.iter().all(|m| m.inside_diet));
            if let Some(first) = s.best_streak.first() {
                let start = input.iter().position(|m| m.id == first.id).unwrap();
                prop_assert_eq!(&input[start..start + s.best_streak.len()], &s.best_streak[..]);
            }
        }

        #[test]
        fn streak_is_first_longest_run(flags in proptest::collection::vec(any::<bool>(), 0..64)) {
            let input = meals(&flags);
            let s = summarize(&input);

            // naive reference: every maximal run with its start index
            let mut runs: Vec<(usize, usize)> = Vec::new();
            let mut i = 0;
            while i < flags.len() {
                if flags[i] {
                    let start = i;
                    while i < flags.len() && flags[i] {
                        i += 1;
                    }
                    runs.push((start, i - start));
                } else {
                    i += 1;
                }
            }
            let longest = runs.iter().map(|r| r.1).max().unwrap_or(0);
            let expected = runs
                .iter()
                .find(|r| r.1 == longest)
                .map(|&(start, len)| input[start..start + len].to_vec())
                .unwrap_or_default();
            prop_assert_eq!(s.best_streak, expected);
        }

        #[test]
        fn idempotent(flags in proptest::collection::vec(any::<bool>(), 0..32)) {
            let input = meals(&flags);
            prop_assert_eq!(summarize(&input), summarize(&input));
        }
    }
}
