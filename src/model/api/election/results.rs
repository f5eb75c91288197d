use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{
    common::{
        demographics::{AgeGroup, Demographics, Gender},
        election::{CandidateId, ElectionId},
    },
    db::{election::Election, vote::Vote},
    mongodb::Id,
};

/// Published results of an election: the tally plus aggregate breakdowns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionResults {
    pub election_id: ElectionId,
    pub total_votes: u64,
    pub turnout: Turnout,
    /// Per-candidate counts, highest first. Ties keep ballot order.
    pub candidates: Vec<CandidateResult>,
    /// Vote counts by voter gender; zero-count categories are omitted.
    pub gender_breakdown: Vec<CategoryCount>,
    /// Vote counts by voter age group; zero-count categories are omitted.
    pub age_breakdown: Vec<CategoryCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turnout {
    /// Voters issued a ballot for this election (its voter log count),
    /// regardless of whether they completed casting.
    pub eligible: u64,
    /// Distinct participating voters for multi-choice elections, otherwise
    /// the vote count (the two coincide when each ballot is one vote).
    pub counted: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub candidate_id: CandidateId,
    pub name: String,
    pub votes: u64,
    pub percentage: f64,
    /// This candidate's votes by voter gender; zero counts omitted.
    pub gender_breakdown: Vec<CategoryCount>,
    /// This candidate's votes by voter age group; zero counts omitted.
    pub age_breakdown: Vec<CategoryCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: u64,
    pub percentage: f64,
}

impl ElectionResults {
    /// Tally the given votes.
    ///
    /// `demographics` maps demographic group IDs to their tuples; votes
    /// whose group is absent count towards the unknown categories.
    /// `voters_voted` is the number of distinct voters who cast a ballot.
    pub fn compute(
        election: &Election,
        votes: &[Vote],
        demographics: &HashMap<Id, Demographics>,
        eligible_voters: u64,
        voters_voted: u64,
    ) -> Self {
        let total_votes = votes.len() as u64;

        let mut per_candidate: HashMap<CandidateId, u64> = HashMap::new();
        let mut per_gender: HashMap<Gender, u64> = HashMap::new();
        let mut per_age: HashMap<AgeGroup, u64> = HashMap::new();
        let mut candidate_genders: HashMap<CandidateId, HashMap<Gender, u64>> = HashMap::new();
        let mut candidate_ages: HashMap<CandidateId, HashMap<AgeGroup, u64>> = HashMap::new();
        for vote in votes {
            *per_candidate.entry(vote.candidate_id).or_default() += 1;
            // The casting engine always records a group, so the unknown
            // fallback only covers votes whose group document went missing.
            let tuple = vote
                .demographic_group_id
                .and_then(|id| demographics.get(&id));
            let (gender, age_group) = match tuple {
                Some(demographics) => (demographics.gender, demographics.age_group),
                None => (Gender::Unknown, AgeGroup::Unknown),
            };
            *per_gender.entry(gender).or_default() += 1;
            *per_age.entry(age_group).or_default() += 1;
            *candidate_genders
                .entry(vote.candidate_id)
                .or_default()
                .entry(gender)
                .or_default() += 1;
            *candidate_ages
                .entry(vote.candidate_id)
                .or_default()
                .entry(age_group)
                .or_default() += 1;
        }

        let empty_genders = HashMap::new();
        let empty_ages = HashMap::new();

        // Every candidate appears, including those with zero votes.
        // The stable sort keeps ballot order among equals.
        let mut candidates = election
            .candidates
            .iter()
            .map(|candidate| {
                let votes = per_candidate.get(&candidate.id).copied().unwrap_or(0);
                let genders = candidate_genders
                    .get(&candidate.id)
                    .unwrap_or(&empty_genders);
                let ages = candidate_ages.get(&candidate.id).unwrap_or(&empty_ages);
                CandidateResult {
                    candidate_id: candidate.id,
                    name: candidate.name.clone(),
                    votes,
                    percentage: percentage(votes, total_votes),
                    gender_breakdown: breakdown(&Gender::ALL, genders, votes),
                    age_breakdown: breakdown(&AgeGroup::ALL, ages, votes),
                }
            })
            .collect::<Vec<_>>();
        candidates.sort_by_key(|result| std::cmp::Reverse(result.votes));

        let counted = if election.max_choices > 1 {
            voters_voted
        } else {
            total_votes
        };

        Self {
            election_id: election.id,
            total_votes,
            turnout: Turnout {
                eligible: eligible_voters,
                counted,
                percentage: percentage(counted, eligible_voters),
            },
            candidates,
            gender_breakdown: breakdown(&Gender::ALL, &per_gender, total_votes),
            age_breakdown: breakdown(&AgeGroup::ALL, &per_age, total_votes),
        }
    }
}

/// Turn per-category counts into an ordered list, skipping empty categories.
fn breakdown<C>(order: &[C], counts: &HashMap<C, u64>, total: u64) -> Vec<CategoryCount>
where
    C: Copy + Eq + std::hash::Hash + std::fmt::Display,
{
    order
        .iter()
        .filter_map(|category| {
            let count = counts.get(category).copied().unwrap_or(0);
            (count > 0).then(|| CategoryCount {
                label: category.to_string(),
                count,
                percentage: percentage(count, total),
            })
        })
        .collect()
}

/// Share of `part` in `whole` as a percentage, rounded to two decimals.
/// An empty whole reads as zero rather than dividing by it.
fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64 * 10000.0).round() / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::db::vote::VoteCore;

    fn vote(candidate_id: CandidateId, group_id: Option<Id>) -> Vote {
        let (core, _salt) = VoteCore::new(1, candidate_id, group_id);
        Vote {
            id: Id::new(),
            vote: core,
        }
    }

    fn tuple(gender: Gender, age_group: AgeGroup) -> Demographics {
        Demographics {
            gender,
            age_group,
            country: "Greece".to_string(),
        }
    }

    #[test]
    fn empty_election_has_zeroed_results() {
        let election = Election::public_example();
        let results = ElectionResults::compute(&election, &[], &HashMap::new(), 0, 0);

        assert_eq!(results.total_votes, 0);
        assert_eq!(results.turnout.percentage, 0.0);
        assert_eq!(results.candidates.len(), election.candidates.len());
        assert!(results.candidates.iter().all(|c| c.votes == 0));
        assert!(results.gender_breakdown.is_empty());
        assert!(results.age_breakdown.is_empty());
    }

    #[test]
    fn candidates_sort_by_votes_with_ballot_order_ties() {
        let election = Election::public_example();
        // Candidate 2 gets two votes; 1 and 3 get one each and tie.
        let votes = vec![
            vote(2, None),
            vote(1, None),
            vote(3, None),
            vote(2, None),
        ];
        let results = ElectionResults::compute(&election, &votes, &HashMap::new(), 10, 4);

        let order: Vec<_> = results
            .candidates
            .iter()
            .map(|c| c.candidate_id)
            .collect();
        assert_eq!(order, vec![2, 1, 3]);
        assert_eq!(results.candidates[0].votes, 2);
        assert_eq!(results.candidates[0].percentage, 50.0);
    }

    #[test]
    fn percentages_round_to_two_decimals() {
        let election = Election::public_example();
        let votes = vec![vote(1, None), vote(2, None), vote(3, None)];
        let results = ElectionResults::compute(&election, &votes, &HashMap::new(), 3, 3);
        assert_eq!(results.candidates[0].percentage, 33.33);
    }

    #[test]
    fn turnout_counts_voters_for_multi_choice() {
        let mut election = Election::public_example();
        let votes = vec![vote(1, None), vote(2, None)];

        // Single choice: two votes means two voters.
        election.election.max_choices = 1;
        let single = ElectionResults::compute(&election, &votes, &HashMap::new(), 4, 1);
        assert_eq!(single.turnout.counted, 2);
        assert_eq!(single.turnout.percentage, 50.0);

        // Multi choice: one voter cast both votes.
        election.election.max_choices = 2;
        let multi = ElectionResults::compute(&election, &votes, &HashMap::new(), 4, 1);
        assert_eq!(multi.turnout.counted, 1);
        assert_eq!(multi.turnout.percentage, 25.0);
    }

    #[test]
    fn full_turnout_when_every_logged_voter_voted() {
        let mut election = Election::public_example();
        election.election.max_choices = 1;
        // Four voter log rows, all with a completed ballot. Registered
        // voters who never opened this election have no log row and do
        // not dilute the percentage.
        let votes = vec![vote(1, None), vote(1, None), vote(2, None), vote(3, None)];
        let results = ElectionResults::compute(&election, &votes, &HashMap::new(), 4, 4);

        assert_eq!(results.turnout.eligible, 4);
        assert_eq!(results.turnout.counted, 4);
        assert_eq!(results.turnout.percentage, 100.0);
    }

    #[test]
    fn breakdowns_follow_category_order_and_skip_empties() {
        let election = Election::public_example();
        let male = Id::new();
        let female = Id::new();
        let demographics = HashMap::from([
            (male, tuple(Gender::Male, AgeGroup::From26To35)),
            (female, tuple(Gender::Female, AgeGroup::From18To25)),
        ]);
        let votes = vec![
            vote(1, Some(male)),
            vote(2, Some(female)),
            vote(3, Some(female)),
        ];
        let results = ElectionResults::compute(&election, &votes, &demographics, 10, 3);

        let genders: Vec<_> = results
            .gender_breakdown
            .iter()
            .map(|c| c.label.as_str())
            .collect();
        assert_eq!(genders, vec!["Male", "Female"]);
        assert_eq!(results.gender_breakdown[1].count, 2);
        assert_eq!(results.gender_breakdown[1].percentage, 66.67);

        let ages: Vec<_> = results
            .age_breakdown
            .iter()
            .map(|c| c.label.as_str())
            .collect();
        assert_eq!(ages, vec!["18-25", "26-35"]);

        // Per-candidate breakdowns are relative to that candidate's votes.
        let first = results
            .candidates
            .iter()
            .find(|c| c.candidate_id == 1)
            .unwrap();
        assert_eq!(first.gender_breakdown.len(), 1);
        assert_eq!(first.gender_breakdown[0].label, "Male");
        assert_eq!(first.gender_breakdown[0].percentage, 100.0);
    }

    #[test]
    fn unknown_demographics_fall_into_the_unknown_category() {
        let election = Election::public_example();
        // One vote with no group, one whose group is missing from the map.
        let votes = vec![vote(1, None), vote(2, Some(Id::new()))];
        let results = ElectionResults::compute(&election, &votes, &HashMap::new(), 5, 2);

        assert_eq!(results.gender_breakdown.len(), 1);
        assert_eq!(results.gender_breakdown[0].label, "Unknown");
        assert_eq!(results.gender_breakdown[0].count, 2);
    }
}
