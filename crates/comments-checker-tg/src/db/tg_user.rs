use crate::prelude::*;
use crate::db::DbError;
use crate::{err, err_ctx, Result};
use sea_query::{OnConflict, Order, SqliteQueryBuilder};
use sea_query_binder::SqlxBinder;
use teloxide::types::User;

/// The user that has written to the bot at least once
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
#[sea_query::enum_def]
pub(crate) struct TgUser {
    pub(crate) id: i64,
    pub(crate) username: Option<String>,
    pub(crate) first_name: String,
    pub(crate) last_name: Option<String>,
}

impl TgUser {
    pub(crate) fn from_tg_api(user: &User) -> Result<Self> {
        let id = i64::try_from(user.id.0).map_err(|_| {
            err!(DbError::ValueOutOfRange {
                column: "tg_user.id",
                value: user.id.0,
            })
        })?;

        Ok(Self {
            id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        })
    }
}

#[derive(Clone)]
pub(crate) struct TgUserRepo {
    db: sqlx::SqlitePool,
}

impl TgUserRepo {
    pub(crate) fn new(db: sqlx::SqlitePool) -> Self {
        Self { db }
    }

    /// Remembers the user. Observing the same user again is a noop, the
    /// first observed display names are kept.
    #[instrument(skip_all, fields(user_id = user.id))]
    pub(crate) async fn observe(&self, user: &TgUser) -> Result {
        let mut on_conflict = OnConflict::column(TgUserIden::Id);
        on_conflict.do_nothing();

        let (sql, values) = sea_query::Query::insert()
            .into_table(TgUserIden::Table)
            .columns([
                TgUserIden::Id,
                TgUserIden::Username,
                TgUserIden::FirstName,
                TgUserIden::LastName,
            ])
            .values_panic([
                user.id.into(),
                user.username.clone().into(),
                user.first_name.clone().into(),
                user.last_name.clone().into(),
            ])
            .on_conflict(on_conflict)
            .build_sqlx(SqliteQueryBuilder);

        let result = sqlx::query_with(&sql, values)
            .execute(&self.db)
            .await
            .map_err(err_ctx!(DbError::Query))?;

        if result.rows_affected() > 0 {
            info!("Observed a new user");
        }

        Ok(())
    }

    pub(crate) async fn get_all(&self) -> Result<Vec<TgUser>> {
        let (sql, values) = sea_query::Query::select()
            .columns([
                TgUserIden::Id,
                TgUserIden::Username,
                TgUserIden::FirstName,
                TgUserIden::LastName,
            ])
            .from(TgUserIden::Table)
            .order_by(TgUserIden::Id, Order::Asc)
            .build_sqlx(SqliteQueryBuilder);

        sqlx::query_as_with::<_, TgUser, _>(&sql, values)
            .fetch_all(&self.db)
            .await
            .map_err(err_ctx!(DbError::Query))
    }
}
