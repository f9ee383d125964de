use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{ConnectOptions, Connection, Row};
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{
    AggregateBar, Dividend, IndicatorKind, IndicatorPoint, MarketHoliday, NewsArticle, Snapshot,
    StockSplit, Table, TickerRecord, Timespan,
};

/// Table and index definitions, applied idempotently on startup
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS aggregates (
        ticker TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        open REAL,
        high REAL,
        low REAL,
        close REAL,
        volume INTEGER,
        vwap REAL,
        timespan TEXT NOT NULL,
        multiplier INTEGER NOT NULL,
        transactions INTEGER,
        PRIMARY KEY (ticker, timestamp, timespan, multiplier)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS snapshots (
        ticker TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        open REAL,
        high REAL,
        low REAL,
        close REAL,
        volume INTEGER,
        prev_close REAL,
        change REAL,
        change_percent REAL,
        updated_at INTEGER,
        PRIMARY KEY (ticker, timestamp)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS technical_indicators (
        ticker TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        indicator_type TEXT NOT NULL,
        value REAL,
        signal_value REAL,
        histogram_value REAL,
        PRIMARY KEY (ticker, timestamp, indicator_type)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tickers (
        ticker TEXT PRIMARY KEY NOT NULL,
        name TEXT,
        market TEXT,
        locale TEXT,
        primary_exchange TEXT,
        type TEXT,
        active BOOLEAN,
        currency_name TEXT,
        cik TEXT,
        composite_figi TEXT,
        share_class_figi TEXT,
        last_updated_utc TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS news (
        id TEXT PRIMARY KEY NOT NULL,
        ticker TEXT,
        title TEXT,
        author TEXT,
        published_utc TIMESTAMP,
        article_url TEXT,
        amp_url TEXT,
        image_url TEXT,
        description TEXT,
        keywords TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS dividends (
        ticker TEXT NOT NULL,
        ex_dividend_date DATE NOT NULL,
        payment_date DATE,
        record_date DATE,
        declared_date DATE,
        amount REAL,
        flag TEXT,
        currency TEXT,
        PRIMARY KEY (ticker, ex_dividend_date)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS stock_splits (
        ticker TEXT NOT NULL,
        execution_date DATE NOT NULL,
        split_from REAL,
        split_to REAL,
        PRIMARY KEY (ticker, execution_date)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS market_holidays (
        date DATE PRIMARY KEY NOT NULL,
        name TEXT,
        exchange TEXT,
        status TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_agg_ticker_time ON aggregates(ticker, timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_snap_ticker ON snapshots(ticker)",
    "CREATE INDEX IF NOT EXISTS idx_news_ticker ON news(ticker)",
    "CREATE INDEX IF NOT EXISTS idx_news_published ON news(published_utc)",
];

/// SQLite store for collected market data
///
/// Holds only connection options: every write opens its own connection,
/// runs the whole batch in one transaction and closes the connection again.
#[derive(Clone, Debug)]
pub struct DatabaseManager {
    options: SqliteConnectOptions,
    database_path: String,
}

impl DatabaseManager {
    /// Open (creating if needed) the database file and ensure the schema exists
    pub async fn new(database_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true);

        let db = DatabaseManager {
            options,
            database_path: database_path.to_string(),
        };

        db.run_migrations().await?;
        info!("Database initialized at {}", database_path);

        Ok(db)
    }

    pub fn path(&self) -> &str {
        &self.database_path
    }

    async fn connect(&self) -> Result<SqliteConnection> {
        Ok(self.options.connect().await?)
    }

    /// Create tables and indexes
    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self.connect().await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&mut conn).await?;
        }

        conn.close().await?;
        debug!("Database schema ready");
        Ok(())
    }

    /// Insert or replace reference tickers
    pub async fn save_tickers(&self, tickers: &[TickerRecord]) -> Result<usize> {
        if tickers.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await?;

        for t in tickers {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO tickers
                (ticker, name, market, locale, primary_exchange, type, active,
                 currency_name, cik, composite_figi, share_class_figi, last_updated_utc)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&t.ticker)
            .bind(&t.name)
            .bind(&t.market)
            .bind(&t.locale)
            .bind(&t.primary_exchange)
            .bind(&t.ticker_type)
            .bind(t.active)
            .bind(&t.currency_name)
            .bind(&t.cik)
            .bind(&t.composite_figi)
            .bind(&t.share_class_figi)
            .bind(t.last_updated_utc)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        conn.close().await?;
        Ok(tickers.len())
    }

    /// Insert or replace aggregate bars
    pub async fn save_aggregates(&self, bars: &[AggregateBar]) -> Result<usize> {
        if bars.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await?;

        for bar in bars {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO aggregates
                (ticker, timestamp, open, high, low, close, volume, vwap,
                 timespan, multiplier, transactions)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&bar.ticker)
            .bind(bar.timestamp)
            .bind(bar.open)
            .bind(bar.high)
            .bind(bar.low)
            .bind(bar.close)
            .bind(bar.volume)
            .bind(bar.vwap)
            .bind(bar.timespan.as_str())
            .bind(bar.multiplier)
            .bind(bar.transactions)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        conn.close().await?;
        Ok(bars.len())
    }

    /// Insert or replace snapshots
    pub async fn save_snapshots(&self, snapshots: &[Snapshot]) -> Result<usize> {
        if snapshots.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await?;

        for s in snapshots {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO snapshots
                (ticker, timestamp, open, high, low, close, volume, prev_close,
                 change, change_percent, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&s.ticker)
            .bind(s.timestamp)
            .bind(s.open)
            .bind(s.high)
            .bind(s.low)
            .bind(s.close)
            .bind(s.volume)
            .bind(s.prev_close)
            .bind(s.change)
            .bind(s.change_percent)
            .bind(s.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        conn.close().await?;
        Ok(snapshots.len())
    }

    /// Insert or replace indicator points
    pub async fn save_indicators(&self, points: &[IndicatorPoint]) -> Result<usize> {
        if points.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await?;

        for p in points {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO technical_indicators
                (ticker, timestamp, indicator_type, value, signal_value, histogram_value)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&p.ticker)
            .bind(p.timestamp)
            .bind(p.indicator.as_str())
            .bind(p.value)
            .bind(p.signal)
            .bind(p.histogram)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        conn.close().await?;
        Ok(points.len())
    }

    /// Insert news articles, leaving already-stored ids untouched
    ///
    /// Returns the number of articles that were actually new.
    pub async fn save_news(&self, articles: &[NewsArticle]) -> Result<usize> {
        if articles.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await?;
        let mut inserted = 0u64;

        for n in articles {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO news
                (id, ticker, title, author, published_utc, article_url,
                 amp_url, image_url, description, keywords)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&n.id)
            .bind(&n.ticker)
            .bind(&n.title)
            .bind(&n.author)
            .bind(n.published_utc)
            .bind(&n.article_url)
            .bind(&n.amp_url)
            .bind(&n.image_url)
            .bind(&n.description)
            .bind(&n.keywords)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        conn.close().await?;
        Ok(inserted as usize)
    }

    /// Insert or replace dividends
    pub async fn save_dividends(&self, dividends: &[Dividend]) -> Result<usize> {
        if dividends.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await?;

        for d in dividends {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO dividends
                (ticker, ex_dividend_date, payment_date, record_date,
                 declared_date, amount, flag, currency)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&d.ticker)
            .bind(d.ex_dividend_date)
            .bind(d.payment_date)
            .bind(d.record_date)
            .bind(d.declared_date)
            .bind(d.amount)
            .bind(&d.flag)
            .bind(&d.currency)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        conn.close().await?;
        Ok(dividends.len())
    }

    /// Insert or replace stock splits
    pub async fn save_splits(&self, splits: &[StockSplit]) -> Result<usize> {
        if splits.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await?;

        for s in splits {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO stock_splits
                (ticker, execution_date, split_from, split_to)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(&s.ticker)
            .bind(s.execution_date)
            .bind(s.split_from)
            .bind(s.split_to)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        conn.close().await?;
        Ok(splits.len())
    }

    /// Insert or replace market holidays
    pub async fn save_holidays(&self, holidays: &[MarketHoliday]) -> Result<usize> {
        if holidays.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await?;

        for h in holidays {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO market_holidays
                (date, name, exchange, status)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(h.date)
            .bind(&h.name)
            .bind(&h.exchange)
            .bind(&h.status)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        conn.close().await?;
        Ok(holidays.len())
    }

    /// Row count of every table, in `Table::ALL` order
    pub async fn table_counts(&self) -> Result<Vec<(Table, i64)>> {
        let mut conn = self.connect().await?;
        let mut counts = Vec::with_capacity(Table::ALL.len());

        for table in Table::ALL {
            let sql = format!("SELECT COUNT(*) FROM {}", table.name());
            let count: i64 = sqlx::query_scalar(&sql).fetch_one(&mut conn).await?;
            counts.push((table, count));
        }

        conn.close().await?;
        Ok(counts)
    }

    pub async fn count_rows(&self, table: Table) -> Result<i64> {
        let mut conn = self.connect().await?;
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&mut conn).await?;
        conn.close().await?;
        Ok(count)
    }

    /// Earliest and latest aggregate timestamps (ms), if any bars are stored
    pub async fn aggregate_time_range(&self) -> Result<Option<(i64, i64)>> {
        let mut conn = self.connect().await?;
        let (min, max): (Option<i64>, Option<i64>) = sqlx::query_as(
            "SELECT MIN(timestamp), MAX(timestamp) FROM aggregates WHERE timestamp IS NOT NULL",
        )
        .fetch_one(&mut conn)
        .await?;
        conn.close().await?;

        Ok(min.zip(max))
    }

    /// Stored bars for one ticker and resolution, oldest first
    pub async fn get_aggregates(
        &self,
        ticker: &str,
        timespan: Timespan,
        multiplier: i64,
    ) -> Result<Vec<AggregateBar>> {
        let mut conn = self.connect().await?;
        let rows = sqlx::query(
            r#"
            SELECT ticker, timestamp, open, high, low, close, volume, vwap,
                   timespan, multiplier, transactions
            FROM aggregates
            WHERE ticker = ? AND timespan = ? AND multiplier = ?
            ORDER BY timestamp
            "#,
        )
        .bind(ticker)
        .bind(timespan.as_str())
        .bind(multiplier)
        .fetch_all(&mut conn)
        .await?;
        conn.close().await?;

        rows.iter().map(aggregate_from_row).collect()
    }

    /// Stored indicator points for one ticker, ordered by timestamp then type
    pub async fn get_indicators(&self, ticker: &str) -> Result<Vec<IndicatorPoint>> {
        let mut conn = self.connect().await?;
        let rows = sqlx::query(
            r#"
            SELECT ticker, timestamp, indicator_type, value, signal_value, histogram_value
            FROM technical_indicators
            WHERE ticker = ?
            ORDER BY timestamp, indicator_type
            "#,
        )
        .bind(ticker)
        .fetch_all(&mut conn)
        .await?;
        conn.close().await?;

        rows.iter().map(indicator_from_row).collect()
    }

    pub async fn get_news_article(&self, id: &str) -> Result<Option<NewsArticle>> {
        let mut conn = self.connect().await?;
        let row = sqlx::query(
            r#"
            SELECT id, ticker, title, author, published_utc, article_url,
                   amp_url, image_url, description, keywords
            FROM news
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&mut conn)
        .await?;
        conn.close().await?;

        row.map(|r| -> Result<NewsArticle> {
            Ok(NewsArticle {
                id: r.try_get("id")?,
                ticker: r.try_get("ticker")?,
                title: r.try_get("title")?,
                author: r.try_get("author")?,
                published_utc: r.try_get("published_utc")?,
                article_url: r.try_get("article_url")?,
                amp_url: r.try_get("amp_url")?,
                image_url: r.try_get("image_url")?,
                description: r.try_get("description")?,
                keywords: r.try_get::<Option<String>, _>("keywords")?.unwrap_or_default(),
            })
        })
        .transpose()
    }
}

fn aggregate_from_row(r: &SqliteRow) -> Result<AggregateBar> {
    let timespan: String = r.try_get("timespan")?;
    let timespan = timespan
        .parse::<Timespan>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(AggregateBar {
        ticker: r.try_get("ticker")?,
        timestamp: r.try_get("timestamp")?,
        open: r.try_get("open")?,
        high: r.try_get("high")?,
        low: r.try_get("low")?,
        close: r.try_get("close")?,
        volume: r.try_get("volume")?,
        vwap: r.try_get("vwap")?,
        timespan,
        multiplier: r.try_get("multiplier")?,
        transactions: r.try_get("transactions")?,
    })
}

fn indicator_from_row(r: &SqliteRow) -> Result<IndicatorPoint> {
    let indicator: String = r.try_get("indicator_type")?;
    let indicator = indicator
        .parse::<IndicatorKind>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(IndicatorPoint {
        ticker: r.try_get("ticker")?,
        timestamp: r.try_get("timestamp")?,
        indicator,
        value: r.try_get("value")?,
        signal: r.try_get("signal_value")?,
        histogram: r.try_get("histogram_value")?,
    })
}
