//! Job-order capability (spec §4.1), grounded on the teacher's
//! `plugins::priority_sort::PrioritySort`.

use std::cmp::Ordering;

use crate::model::PodGroup;
use crate::ordering::job_order::job_order;
use crate::plugins::JobOrderPlugin;

pub struct PrioritySort;

impl JobOrderPlugin for PrioritySort {
    fn name(&self) -> &str {
        "PrioritySort"
    }

    fn compare(&self, a: &PodGroup, b: &PodGroup) -> Ordering {
        job_order(a, b)
    }
}
