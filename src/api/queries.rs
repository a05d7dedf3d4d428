//! Aggregation queries backing the dashboard endpoints.

use crate::error::{ProcessingError, Result};
use crate::models::CanonicalRecord;
use crate::utils::constants::{GOOD_AQI_MAX, MODERATE_AQI_MAX};
use crate::utils::timestamp::api_timestamp;
use rusqlite::{params, Connection};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountyAverage {
    #[serde(rename = "County")]
    pub county: Option<String>,
    pub average_aqi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearAverage {
    pub year: i32,
    pub average_aqi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthAverage {
    pub month: u32,
    pub average_aqi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthDistribution {
    pub month: u32,
    pub good_days: u32,
    pub moderate_days: u32,
    pub unhealthy_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnhealthyDaysComparison {
    pub current_year: i32,
    pub unhealthy_days: u64,
    pub previous_year: i32,
    pub previous_unhealthy_days: u64,
    pub change_percentage: Option<f64>,
}

/// Average AQI per county over each site's latest reading.
pub fn county_summary(conn: &Connection) -> Result<Vec<CountyAverage>> {
    let mut stmt = conn.prepare(
        "WITH ranked AS (
             SELECT *, ROW_NUMBER() OVER (PARTITION BY SiteName ORDER BY DataCreationDate DESC) AS rn
             FROM air_quality_records
         )
         SELECT County, ROUND(AVG(AQI)) AS average_aqi
         FROM ranked
         WHERE rn = 1 AND AQI IS NOT NULL
         GROUP BY County
         ORDER BY County",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(CountyAverage {
            county: row.get(0)?,
            average_aqi: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Latest full record of every site in a county.
pub fn county_latest(conn: &Connection, county: &str) -> Result<Vec<CanonicalRecord>> {
    let mut stmt = conn.prepare(
        "WITH ranked AS (
             SELECT *, ROW_NUMBER() OVER (PARTITION BY SiteName ORDER BY DataCreationDate DESC) AS rn
             FROM air_quality_records
             WHERE County = ?1
         )
         SELECT SiteId, SiteName, County, AQI, Status, DataCreationDate, Latitude, Longitude
         FROM ranked
         WHERE rn = 1
         ORDER BY SiteId",
    )?;
    let rows = stmt.query_map(params![county], |row| {
        let created: Option<String> = row.get(5)?;
        Ok(CanonicalRecord {
            site_id: row.get(0)?,
            site_name: row.get(1)?,
            county: row.get(2)?,
            aqi: row.get(3)?,
            status: row.get(4)?,
            data_creation_date: created.as_deref().map(api_timestamp),
            latitude: row.get(6)?,
            longitude: row.get(7)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn annual_trend(conn: &Connection, county: &str) -> Result<Vec<YearAverage>> {
    let mut stmt = conn.prepare(
        "SELECT CAST(strftime('%Y', DataCreationDate) AS INTEGER) AS year, ROUND(AVG(AQI))
         FROM historical_aqi_analysis
         WHERE County = ?1 AND AQI IS NOT NULL AND strftime('%Y', DataCreationDate) IS NOT NULL
         GROUP BY year
         ORDER BY year",
    )?;
    let rows = stmt.query_map(params![county], |row| {
        Ok(YearAverage {
            year: row.get(0)?,
            average_aqi: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn annual_map(conn: &Connection, year: i32) -> Result<Vec<CountyAverage>> {
    let mut stmt = conn.prepare(
        "SELECT County, ROUND(AVG(AQI))
         FROM historical_aqi_analysis
         WHERE CAST(strftime('%Y', DataCreationDate) AS INTEGER) = ?1 AND AQI IS NOT NULL
         GROUP BY County
         ORDER BY County",
    )?;
    let rows = stmt.query_map(params![year], |row| {
        Ok(CountyAverage {
            county: row.get(0)?,
            average_aqi: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Average AQI per calendar month across all years, always 12 entries.
pub fn seasonal_trend(conn: &Connection, county: &str) -> Result<Vec<MonthAverage>> {
    let mut stmt = conn.prepare(
        "SELECT CAST(strftime('%m', DataCreationDate) AS INTEGER) AS month, ROUND(AVG(AQI))
         FROM historical_aqi_analysis
         WHERE County = ?1 AND AQI IS NOT NULL AND strftime('%m', DataCreationDate) IS NOT NULL
         GROUP BY month
         ORDER BY month",
    )?;
    let rows = stmt
        .query_map(params![county], |row| {
            Ok(MonthAverage {
                month: row.get(0)?,
                average_aqi: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(fill_months(rows, |r| r.month, |month| MonthAverage {
        month,
        average_aqi: 0.0,
    }))
}

/// Good/moderate/unhealthy day counts per month of one year, always 12 entries.
///
/// A day is bucketed by the average of all its readings.
pub fn monthly_distribution(conn: &Connection, county: &str, year: i32) -> Result<Vec<MonthDistribution>> {
    let mut stmt = conn.prepare(
        "SELECT month,
                SUM(CASE WHEN daily_avg_aqi <= ?3 THEN 1 ELSE 0 END),
                SUM(CASE WHEN daily_avg_aqi > ?3 AND daily_avg_aqi <= ?4 THEN 1 ELSE 0 END),
                SUM(CASE WHEN daily_avg_aqi > ?4 THEN 1 ELSE 0 END)
         FROM (
             SELECT CAST(strftime('%m', DataCreationDate) AS INTEGER) AS month,
                    date(DataCreationDate) AS day,
                    AVG(AQI) AS daily_avg_aqi
             FROM historical_aqi_analysis
             WHERE County = ?1
               AND CAST(strftime('%Y', DataCreationDate) AS INTEGER) = ?2
               AND AQI IS NOT NULL
             GROUP BY month, day
         )
         GROUP BY month
         ORDER BY month",
    )?;
    let rows = stmt
        .query_map(params![county, year, GOOD_AQI_MAX, MODERATE_AQI_MAX], |row| {
            Ok(MonthDistribution {
                month: row.get(0)?,
                good_days: row.get(1)?,
                moderate_days: row.get(2)?,
                unhealthy_days: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(fill_months(rows, |r| r.month, |month| MonthDistribution {
        month,
        good_days: 0,
        moderate_days: 0,
        unhealthy_days: 0,
    }))
}

/// Days in a year whose average AQI exceeded the moderate bound.
pub fn unhealthy_days(conn: &Connection, county: &str, year: i32) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*)
         FROM (
             SELECT date(DataCreationDate) AS day, AVG(AQI) AS daily_avg_aqi
             FROM historical_aqi_analysis
             WHERE County = ?1
               AND CAST(strftime('%Y', DataCreationDate) AS INTEGER) = ?2
               AND AQI IS NOT NULL
             GROUP BY day
         )
         WHERE daily_avg_aqi > ?3",
        params![county, year, MODERATE_AQI_MAX],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}

pub fn unhealthy_days_comparison(conn: &Connection, county: &str, year: i32) -> Result<UnhealthyDaysComparison> {
    let previous_year = year
        .checked_sub(1)
        .ok_or_else(|| ProcessingError::InvalidParameter(format!("year {} has no predecessor", year)))?;
    let current = unhealthy_days(conn, county, year)?;
    let previous = unhealthy_days(conn, county, previous_year)?;

    Ok(UnhealthyDaysComparison {
        current_year: year,
        unhealthy_days: current,
        previous_year,
        previous_unhealthy_days: previous,
        change_percentage: change_percentage(current, previous),
    })
}

/// Percentage change rounded to two decimals; `None` when there is no baseline.
pub fn change_percentage(current: u64, previous: u64) -> Option<f64> {
    if previous == 0 {
        return None;
    }
    let change = (current as f64 - previous as f64) / previous as f64 * 100.0;
    Some((change * 100.0).round() / 100.0)
}

/// Place rows into months 1..=12, synthesizing a blank row for each missing month.
pub fn fill_months<T>(rows: Vec<T>, month_of: impl Fn(&T) -> u32, blank: impl Fn(u32) -> T) -> Vec<T> {
    let mut slots: Vec<Option<T>> = (1..=12).map(|_| None).collect();
    for row in rows {
        let month = month_of(&row);
        if (1..=12).contains(&month) {
            slots[(month - 1) as usize] = Some(row);
        }
    }
    slots
        .into_iter()
        .zip(1..=12)
        .map(|(slot, month)| slot.unwrap_or_else(|| blank(month)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Store;
    use pretty_assertions::assert_eq;

    fn seed_historical(store: &Store, rows: &[(i64, &str, i64, &str)]) {
        for (site, county, aqi, ts) in rows {
            store
                .connection()
                .execute(
                    "INSERT INTO historical_aqi_analysis (SiteId, SiteName, County, AQI, DataCreationDate)
                     VALUES (?1, 'site', ?2, ?3, ?4)",
                    params![site, county, aqi, ts],
                )
                .unwrap();
        }
    }

    fn seed_recent(store: &Store, rows: &[(i64, &str, &str, Option<i64>, &str)]) {
        for (site, name, county, aqi, ts) in rows {
            store
                .connection()
                .execute(
                    "INSERT INTO air_quality_records (SiteId, SiteName, County, AQI, DataCreationDate)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![site, name, county, aqi, ts],
                )
                .unwrap();
        }
    }

    #[test]
    fn test_change_percentage() {
        assert_eq!(change_percentage(5, 0), None);
        assert_eq!(change_percentage(0, 0), None);
        assert_eq!(change_percentage(15, 10), Some(50.0));
        assert_eq!(change_percentage(2, 3), Some(-33.33));
    }

    #[test]
    fn test_fill_months() {
        let filled = fill_months(vec![(3u32, 7), (12, 1), (13, 9)], |r| r.0, |m| (m, 0));
        assert_eq!(filled.len(), 12);
        assert_eq!(filled[0], (1, 0));
        assert_eq!(filled[2], (3, 7));
        assert_eq!(filled[11], (12, 1));
    }

    #[test]
    fn test_county_summary_uses_latest_reading_per_site() -> Result<()> {
        let store = Store::open_in_memory()?;
        seed_recent(
            &store,
            &[
                (1, "A", "臺北市", Some(100), "2024-05-01 09:00:00"),
                (1, "A", "臺北市", Some(40), "2024-05-01 10:00:00"),
                (2, "B", "臺北市", Some(61), "2024-05-01 10:00:00"),
                (3, "C", "高雄市", None, "2024-05-01 10:00:00"),
            ],
        );

        let summary = county_summary(store.connection())?;
        assert_eq!(
            summary,
            vec![CountyAverage {
                county: Some("臺北市".to_string()),
                average_aqi: 51.0
            }]
        );

        let latest = county_latest(store.connection(), "臺北市")?;
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].aqi, Some(40));
        assert_eq!(latest[0].data_creation_date.as_deref(), Some("2024-05-01T10:00:00"));
        Ok(())
    }

    #[test]
    fn test_annual_queries() -> Result<()> {
        let store = Store::open_in_memory()?;
        seed_historical(
            &store,
            &[
                (1, "臺中市", 40, "2022-01-01 00:00:00"),
                (1, "臺中市", 60, "2022-06-01 00:00:00"),
                (1, "臺中市", 80, "2023-01-01 00:00:00"),
                (2, "彰化縣", 30, "2023-01-01 00:00:00"),
            ],
        );

        assert_eq!(
            annual_trend(store.connection(), "臺中市")?,
            vec![
                YearAverage { year: 2022, average_aqi: 50.0 },
                YearAverage { year: 2023, average_aqi: 80.0 },
            ]
        );
        assert_eq!(annual_map(store.connection(), 2023)?.len(), 2);
        assert!(annual_map(store.connection(), 1990)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_seasonal_trend_is_zero_filled() -> Result<()> {
        let store = Store::open_in_memory()?;
        seed_historical(
            &store,
            &[
                (1, "臺中市", 40, "2022-03-01 00:00:00"),
                (1, "臺中市", 50, "2023-03-01 00:00:00"),
            ],
        );

        let trend = seasonal_trend(store.connection(), "臺中市")?;
        assert_eq!(trend.len(), 12);
        assert_eq!(trend[2], MonthAverage { month: 3, average_aqi: 45.0 });
        assert_eq!(trend[0], MonthAverage { month: 1, average_aqi: 0.0 });

        let empty = seasonal_trend(store.connection(), "nowhere")?;
        assert_eq!(empty.len(), 12);
        assert!(empty.iter().all(|m| m.average_aqi == 0.0));
        Ok(())
    }

    #[test]
    fn test_monthly_distribution_buckets_daily_averages() -> Result<()> {
        let store = Store::open_in_memory()?;
        seed_historical(
            &store,
            &[
                // Jan 1: avg 45 -> good
                (1, "臺中市", 40, "2023-01-01 00:00:00"),
                (2, "臺中市", 50, "2023-01-01 01:00:00"),
                // Jan 2: avg 100 -> moderate
                (1, "臺中市", 100, "2023-01-02 00:00:00"),
                // Feb 1: avg 150 -> unhealthy
                (1, "臺中市", 150, "2023-02-01 00:00:00"),
                // other year, ignored
                (1, "臺中市", 150, "2022-02-01 00:00:00"),
            ],
        );

        let dist = monthly_distribution(store.connection(), "臺中市", 2023)?;
        assert_eq!(dist.len(), 12);
        assert_eq!(
            dist[0],
            MonthDistribution { month: 1, good_days: 1, moderate_days: 1, unhealthy_days: 0 }
        );
        assert_eq!(
            dist[1],
            MonthDistribution { month: 2, good_days: 0, moderate_days: 0, unhealthy_days: 1 }
        );
        assert_eq!(
            dist[11],
            MonthDistribution { month: 12, good_days: 0, moderate_days: 0, unhealthy_days: 0 }
        );
        Ok(())
    }

    #[test]
    fn test_unhealthy_days_comparison() -> Result<()> {
        let store = Store::open_in_memory()?;
        seed_historical(
            &store,
            &[
                (1, "臺中市", 120, "2023-01-01 00:00:00"),
                (1, "臺中市", 130, "2023-01-02 00:00:00"),
                (1, "臺中市", 150, "2022-01-01 00:00:00"),
            ],
        );

        let comparison = unhealthy_days_comparison(store.connection(), "臺中市", 2023)?;
        assert_eq!(
            comparison,
            UnhealthyDaysComparison {
                current_year: 2023,
                unhealthy_days: 2,
                previous_year: 2022,
                previous_unhealthy_days: 1,
                change_percentage: Some(100.0),
            }
        );

        let no_baseline = unhealthy_days_comparison(store.connection(), "臺中市", 2022)?;
        assert_eq!(no_baseline.previous_unhealthy_days, 0);
        assert_eq!(no_baseline.change_percentage, None);

        assert!(matches!(
            unhealthy_days_comparison(store.connection(), "臺中市", i32::MIN),
            Err(ProcessingError::InvalidParameter(_))
        ));
        Ok(())
    }
}
