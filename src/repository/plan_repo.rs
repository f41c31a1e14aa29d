// ==========================================
// 工厂流水线规划系统 - 生产方案数据仓储
// ==========================================
// 职责: production_plan 表的增删查改,
//       方案载荷以 LineDoc JSON 存储
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::engine::line::{ProductionLine, BALANCE_EPSILON_PER_MINUTE};
use crate::engine::unit::PolicyRegistry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::plan_doc::{decode_line, encode_line, LineDoc};
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

// ==========================================
// PlanRecord - 方案元数据
// ==========================================

/// 方案元数据行
#[derive(Debug, Clone)]
pub struct PlanRecord {
    pub plan_id: String,
    pub plan_name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// PlanRepository - 生产方案仓储
// ==========================================
pub struct PlanRepository {
    conn: Arc<Mutex<Connection>>,
    registry: Rc<PolicyRegistry>,
    balance_epsilon: f64,
}

impl PlanRepository {
    /// 创建仓储(默认平衡阈值)
    pub fn new(conn: Arc<Mutex<Connection>>, registry: Rc<PolicyRegistry>) -> Self {
        Self {
            conn,
            registry,
            balance_epsilon: BALANCE_EPSILON_PER_MINUTE,
        }
    }

    /// 指定平衡阈值创建(加载的生产线沿用该阈值)
    pub fn with_epsilon(
        conn: Arc<Mutex<Connection>>,
        registry: Rc<PolicyRegistry>,
        balance_epsilon: f64,
    ) -> Self {
        Self {
            conn,
            registry,
            balance_epsilon,
        }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 初始化 production_plan 表
    pub fn init_schema(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS production_plan (
                plan_id      TEXT PRIMARY KEY,
                plan_name    TEXT NOT NULL,
                payload_json TEXT NOT NULL,
                created_at   TEXT NOT NULL,
                updated_at   TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// 保存新方案,返回元数据
    pub fn save(&self, plan_name: &str, line: &ProductionLine) -> RepositoryResult<PlanRecord> {
        let doc = encode_line(line);
        let payload = serde_json::to_string(&doc)?;
        let now = Utc::now().naive_utc();
        let record = PlanRecord {
            plan_id: uuid::Uuid::new_v4().to_string(),
            plan_name: plan_name.to_string(),
            created_at: now,
            updated_at: now,
        };

        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO production_plan (plan_id, plan_name, payload_json, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                record.plan_id,
                record.plan_name,
                payload,
                record.created_at,
                record.updated_at
            ],
        )?;
        Ok(record)
    }

    /// 覆写已有方案的载荷
    pub fn update(&self, plan_id: &str, line: &ProductionLine) -> RepositoryResult<()> {
        let doc = encode_line(line);
        let payload = serde_json::to_string(&doc)?;
        let now = Utc::now().naive_utc();

        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE production_plan SET payload_json = ?2, updated_at = ?3 WHERE plan_id = ?1",
            params![plan_id, payload, now],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ProductionPlan".to_string(),
                id: plan_id.to_string(),
            });
        }
        Ok(())
    }

    /// 按 id 加载方案,重建完整接线的生产线
    pub fn load(&self, plan_id: &str) -> RepositoryResult<(PlanRecord, ProductionLine)> {
        let (record, payload) = {
            let conn = self.get_conn()?;
            conn.query_row(
                r#"SELECT plan_id, plan_name, payload_json, created_at, updated_at
                   FROM production_plan WHERE plan_id = ?1"#,
                params![plan_id],
                |row| {
                    Ok((
                        PlanRecord {
                            plan_id: row.get(0)?,
                            plan_name: row.get(1)?,
                            created_at: row.get(3)?,
                            updated_at: row.get(4)?,
                        },
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                    entity: "ProductionPlan".to_string(),
                    id: plan_id.to_string(),
                },
                other => other.into(),
            })?
        };

        let doc: LineDoc = serde_json::from_str(&payload)?;
        let line = decode_line(&doc, &self.registry, self.balance_epsilon)?;
        Ok((record, line))
    }

    /// 加载全部方案(已接线),按创建时间排序
    pub fn load_all(&self) -> RepositoryResult<Vec<(PlanRecord, ProductionLine)>> {
        let ids: Vec<String> = {
            let conn = self.get_conn()?;
            let mut stmt =
                conn.prepare("SELECT plan_id FROM production_plan ORDER BY created_at, plan_id")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<String>, _>>()?
        };

        ids.iter().map(|id| self.load(id)).collect()
    }

    /// 方案元数据列表
    pub fn list(&self) -> RepositoryResult<Vec<PlanRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT plan_id, plan_name, created_at, updated_at
               FROM production_plan ORDER BY created_at, plan_id"#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PlanRecord {
                plan_id: row.get(0)?,
                plan_name: row.get(1)?,
                created_at: row.get(2)?,
                updated_at: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 删除方案
    pub fn delete(&self, plan_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM production_plan WHERE plan_id = ?1",
            params![plan_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ProductionPlan".to_string(),
                id: plan_id.to_string(),
            });
        }
        Ok(())
    }
}
