//! Group partitioner.
//!
//! Shuffles the participants of a session and cuts them into groups of two
//! or three, never leaving anyone alone unless only one person signed up.
//! Pure and stateless: the shuffle source is a parameter so results are
//! reproducible under a fixed seed.

use coffeemate_types::session::{Group, Member};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

/// Partition `members` into groups of 2-3.
///
/// After shuffling, members are consumed left to right:
/// - 2 or 4 remaining: take a pair (4 becomes two pairs, never 3 + 1)
/// - 1 remaining: join the most recent group, or form a group of one if no
///   group exists yet (input of size 1)
/// - otherwise: take three
///
/// For `n >= 2` every group has 2 or 3 members. An empty input yields no groups.
pub fn partition<R: Rng + ?Sized>(mut members: Vec<Member>, rng: &mut R) -> Vec<Group> {
    members.shuffle(rng);

    let mut remaining = members.len();
    let mut groups: Vec<Group> = Vec::with_capacity(remaining / 2 + 1);
    let mut shuffled = members.into_iter();

    while remaining > 0 {
        let take = match remaining {
            1 => {
                let Some(lone) = shuffled.next() else { break };
                match groups.last_mut() {
                    Some(last) => last.members.push(lone),
                    None => groups.push(Group {
                        members: vec![lone],
                    }),
                }
                break;
            }
            2 | 4 => 2,
            _ => 3,
        };

        groups.push(Group {
            members: shuffled.by_ref().take(take).collect(),
        });
        remaining -= take;
    }

    groups
}

/// [`partition`] with a deterministic shuffle derived from `seed`.
pub fn partition_seeded(members: Vec<Member>, seed: u64) -> Vec<Group> {
    let mut rng = StdRng::seed_from_u64(seed);
    partition(members, &mut rng)
}
