//! Active-league listing for filter UIs.

use serde::Serialize;

use crate::models::League;
use crate::query::QueryError;

use super::DashboardService;

const LEAGUES_SQL: &str = r#"SELECT id, name, short_name, region, logo_url
FROM leagues
WHERE active = TRUE
ORDER BY name ASC"#;

#[derive(Serialize)]
struct LeaguesKey;

impl DashboardService {
    pub async fn active_leagues(&self) -> Result<Vec<League>, QueryError> {
        self.cached("leagues:active", &LeaguesKey, || async {
            let leagues = self
                .guard
                .run_single("leagues:active", async {
                    Ok(sqlx::query_as::<_, League>(LEAGUES_SQL)
                        .fetch_all(&self.pool)
                        .await?)
                })
                .await?;
            Ok(leagues)
        })
        .await
    }
}
