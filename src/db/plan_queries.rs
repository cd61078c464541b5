use super::models::{PlanListing, StoredPlan};
use super::Database;
use crate::balancer::{PlannerConfig, StopReason, SwapPlan, SwapProposal};
use crate::cluster::ClusterStats;
use anyhow::Result;
use rusqlite::{params, OptionalExtension};

fn map_swap_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SwapProposal> {
    Ok(SwapProposal {
        step: row.get::<_, i64>(0)? as usize,
        from: row.get(1)?,
        from_name: row.get(2)?,
        to: row.get(3)?,
        to_name: row.get(4)?,
        bytes: row.get::<_, i64>(5)? as u64,
        delta_from: row.get(6)?,
        delta_to: row.get(7)?,
        from_utilization_after: row.get(8)?,
        to_utilization_after: row.get(9)?,
        stddev_before: row.get(10)?,
        stddev_after: row.get(11)?,
    })
}

impl Database {
    /// Store a plan and all its swaps, returning the new plan id.
    pub fn insert_plan(&self, plan: &SwapPlan) -> Result<i64> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO swap_plans \
             (protected_level, min_improvement, max_iterations, device_count, initial_mean, \
              initial_stddev, projected_mean, projected_stddev, constrained_min_stddev, \
              iterations, stop_reason, total_swaps, total_bytes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                plan.config.protected_level,
                plan.config.min_improvement,
                plan.config.max_iterations.map(|v| v as i64),
                plan.initial.device_count as i64,
                plan.initial.mean_utilization,
                plan.initial.stddev_utilization,
                plan.projected.mean_utilization,
                plan.projected.stddev_utilization,
                plan.constrained_min_stddev,
                plan.iterations as i64,
                plan.stop_reason.as_str(),
                plan.swaps.len() as i64,
                plan.total_bytes() as i64,
            ],
        )?;
        let plan_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO plan_swaps \
                 (plan_id, step, from_id, from_name, to_id, to_name, bytes, delta_from, delta_to, \
                  from_utilization_after, to_utilization_after, stddev_before, stddev_after)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )?;
            for swap in &plan.swaps {
                stmt.execute(params![
                    plan_id,
                    swap.step as i64,
                    swap.from,
                    swap.from_name,
                    swap.to,
                    swap.to_name,
                    swap.bytes as i64,
                    swap.delta_from,
                    swap.delta_to,
                    swap.from_utilization_after,
                    swap.to_utilization_after,
                    swap.stddev_before,
                    swap.stddev_after,
                ])?;
            }
        }

        tx.commit()?;
        Ok(plan_id)
    }

    /// Get a stored plan with its swaps in step order.
    pub fn get_plan(&self, plan_id: i64) -> Result<Option<StoredPlan>> {
        let conn = self.conn();
        let header = conn
            .query_row(
                "SELECT id, created_at, protected_level, min_improvement, max_iterations, \
                        device_count, initial_mean, initial_stddev, projected_mean, \
                        projected_stddev, constrained_min_stddev, iterations, stop_reason
                 FROM swap_plans WHERE id = ?1",
                params![plan_id],
                |row| {
                    let reason: String = row.get(12)?;
                    let stop_reason = StopReason::try_from(reason.as_str()).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            12,
                            rusqlite::types::Type::Text,
                            Box::from(e),
                        )
                    })?;
                    let device_count = row.get::<_, i64>(5)? as usize;
                    let plan = SwapPlan {
                        config: PlannerConfig {
                            protected_level: row.get(2)?,
                            min_improvement: row.get(3)?,
                            max_iterations: row.get::<_, Option<i64>>(4)?.map(|v| v as usize),
                        },
                        initial: ClusterStats {
                            device_count,
                            mean_utilization: row.get(6)?,
                            stddev_utilization: row.get(7)?,
                        },
                        projected: ClusterStats {
                            device_count,
                            mean_utilization: row.get(8)?,
                            stddev_utilization: row.get(9)?,
                        },
                        constrained_min_stddev: row.get(10)?,
                        iterations: row.get::<_, i64>(11)? as usize,
                        stop_reason,
                        swaps: Vec::new(),
                    };
                    Ok(StoredPlan { id: row.get(0)?, created_at: row.get(1)?, plan })
                },
            )
            .optional()?;

        let Some(mut stored) = header else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT step, from_id, from_name, to_id, to_name, bytes, delta_from, delta_to, \
                    from_utilization_after, to_utilization_after, stddev_before, stddev_after
             FROM plan_swaps WHERE plan_id = ?1 ORDER BY step",
        )?;
        stored.plan.swaps =
            stmt.query_map(params![plan_id], map_swap_row)?.collect::<Result<Vec<_>, _>>()?;

        Ok(Some(stored))
    }

    /// List stored plans, newest first.
    pub fn list_plans(&self) -> Result<Vec<PlanListing>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, created_at, device_count, initial_stddev, projected_stddev, \
                    total_swaps, total_bytes, stop_reason
             FROM swap_plans ORDER BY id DESC",
        )?;

        let plans = stmt
            .query_map([], |row| {
                Ok(PlanListing {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                    device_count: row.get::<_, i64>(2)? as usize,
                    initial_stddev: row.get(3)?,
                    projected_stddev: row.get(4)?,
                    total_swaps: row.get::<_, i64>(5)? as usize,
                    total_bytes: row.get::<_, i64>(6)? as u64,
                    stop_reason: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(plans)
    }
}
