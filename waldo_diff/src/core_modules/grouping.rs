// THEORY:
// The `grouping` module is the Grouping Engine, the heart of the spot-the-
// difference detector. Thresholding rarely yields one contour per edit: a
// recoloured shirt may come apart into several blobs, a moved row of dots into
// many. This engine decides which regions belong together.
//
// Algorithm steps (greedy connected expansion):
// 1.  **Seeding**: regions are visited largest-area first (ties keep input
//     order). Large regions are the most reliable anchors, so they become the
//     seeds of new groups.
// 2.  **Expansion**: the group keeps scanning the still-unassigned regions in
//     that same order and absorbs the FIRST one that `should_group` relates to
//     ANY current member, then restarts the scan. A full scan that absorbs
//     nothing ends the group.
// 3.  **Safety Bound**: each group gets at most `iteration_cap` scans. Hitting
//     the cap closes the group with whatever it has; leftovers seed later
//     groups. A cap that leaves a related region behind is counted in
//     `GroupingStats::capped_expansions`, not reported as an error.
//
// Membership is tracked as an explicit index -> group-id table rather than by
// flipping flags on the regions while iterating over them. On inputs that
// hit the cap, the first-match-restart scan order decides which regions end
// up together.

use crate::core_modules::region::DifferenceRegion;
use crate::core_modules::similarity::{SimilarityProfile, should_group};
use tracing::{debug, warn};

pub const DEFAULT_ITERATION_CAP: usize = 100;

/// Regions judged to be one logical difference. Never empty.
#[derive(Debug, Clone)]
pub struct DifferenceGroup {
    /// Members in the order they joined; the first is the seed.
    pub regions: Vec<DifferenceRegion>,
}

impl DifferenceGroup {
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Every contour point of every member.
    pub fn points(&self) -> Vec<imageproc::point::Point<i32>> {
        self.regions.iter().flat_map(|r| r.contour.points.iter().copied()).collect()
    }

    /// Sum of the member areas.
    pub fn total_area(&self) -> f64 {
        self.regions.iter().map(|r| r.area).sum()
    }
}

/// Diagnostics from one grouping pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Total expansion scans performed across all groups.
    pub expansion_scans: usize,
    /// Groups whose expansion was cut short by the iteration cap.
    pub capped_expansions: usize,
}

/// Clusters regions into groups under a similarity profile.
#[derive(Debug, Clone)]
pub struct GroupingEngine {
    touch_distance: f64,
    profile: SimilarityProfile,
    iteration_cap: usize,
}

impl GroupingEngine {
    pub fn new(touch_distance: f64, profile: SimilarityProfile) -> Self {
        Self {
            touch_distance,
            profile,
            iteration_cap: DEFAULT_ITERATION_CAP,
        }
    }

    /// Overrides the per-group scan limit. Mostly useful for exercising the cap.
    pub fn with_iteration_cap(mut self, iteration_cap: usize) -> Self {
        self.iteration_cap = iteration_cap.max(1);
        self
    }

    /// Partitions `regions` into groups. Every region ends up in exactly one group.
    pub fn group(&self, regions: Vec<DifferenceRegion>) -> (Vec<DifferenceGroup>, GroupingStats) {
        let (members, stats) = self.assign(&regions);

        let mut slots: Vec<Option<DifferenceRegion>> = regions.into_iter().map(Some).collect();
        let groups: Vec<DifferenceGroup> = members
            .into_iter()
            .map(|indices| DifferenceGroup {
                regions: indices.into_iter().filter_map(|i| slots[i].take()).collect(),
            })
            .collect();

        debug!(
            groups = groups.len(),
            scans = stats.expansion_scans,
            capped = stats.capped_expansions,
            "grouping complete"
        );
        (groups, stats)
    }

    /// The grouping itself, on indices: returns each group's member indices in join order.
    pub fn assign(&self, regions: &[DifferenceRegion]) -> (Vec<Vec<usize>>, GroupingStats) {
        let mut order: Vec<usize> = (0..regions.len()).collect();
        // `sort_by` is stable, so equal areas keep their input order.
        order.sort_by(|&a, &b| regions[b].area.total_cmp(&regions[a].area));

        let mut assigned: Vec<Option<usize>> = vec![None; regions.len()];
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut stats = GroupingStats::default();

        for &seed in &order {
            if assigned[seed].is_some() {
                continue;
            }
            let group_id = groups.len();
            let mut members = vec![seed];
            assigned[seed] = Some(group_id);

            let mut group_changed = true;
            let mut scans = 0;
            while group_changed && scans < self.iteration_cap {
                scans += 1;
                group_changed = false;

                if let Some(candidate) = self.first_related(regions, &order, &members, &assigned) {
                    members.push(candidate);
                    assigned[candidate] = Some(group_id);
                    group_changed = true;
                }
            }

            stats.expansion_scans += scans;
            // The last allowed scan may have completed the group; only count a cap that left
            // a related region behind.
            if group_changed && self.first_related(regions, &order, &members, &assigned).is_some() {
                stats.capped_expansions += 1;
                warn!(
                    group = group_id + 1,
                    members = members.len(),
                    cap = self.iteration_cap,
                    "group expansion hit the iteration cap"
                );
            }
            groups.push(members);
        }

        (groups, stats)
    }

    /// First unassigned region, in scan order, that groups with any current member.
    fn first_related(
        &self,
        regions: &[DifferenceRegion],
        order: &[usize],
        members: &[usize],
        assigned: &[Option<usize>],
    ) -> Option<usize> {
        order.iter().copied().find(|&candidate| {
            assigned[candidate].is_none()
                && members.iter().any(|&member| {
                    should_group(&regions[member], &regions[candidate], self.touch_distance, &self.profile)
                })
        })
    }
}
