// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::product::{DistributorRow, PersistedProduct, ResultEnvelope};
use crate::domain::repositories::crawl_unit_repository::RepositoryError;
use crate::domain::repositories::product_repository::ProductRepository;
use crate::infrastructure::database::entities::{distributor, product};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 单条 INSERT 的最大行数，避免超过数据库的绑定参数上限
const INSERT_CHUNK_ROWS: usize = 1000;

/// 产品仓库实现
///
/// 依靠 `products.crawl_id` 与 `distributors(product_id, name, sku)` 上的唯一索引，
/// 重复写入通过 `ON CONFLICT DO NOTHING` 被忽略。
#[derive(Clone)]
pub struct ProductRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl ProductRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn product_model(envelope: &ResultEnvelope, now: DateTime<FixedOffset>) -> product::ActiveModel {
        let record = &envelope.product;
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            crawl_id: Set(envelope.crawl_id),
            batch_id: Set(envelope.batch_id),
            mpn: Set(record.mpn.clone()),
            url: Set(record.url.clone()),
            title: Set(record.title.clone()),
            brand: Set(record.brand.clone()),
            median_price: Set(record.median_price.clone()),
            created_at: Set(now),
        }
    }

    fn distributor_model(row: &DistributorRow, now: DateTime<FixedOffset>) -> distributor::ActiveModel {
        let offer = &row.offer;
        distributor::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(row.product_id),
            name: Set(offer.name.clone()),
            sku: Set(offer.sku.clone()),
            stock: Set(offer.stock),
            min_quantity: Set(offer.min),
            packaging: Set(offer.pkg.clone()),
            currency: Set(offer.currency.clone()),
            price_1: Set(offer.price_at("1")),
            price_10: Set(offer.price_at("10")),
            price_100: Set(offer.price_at("100")),
            price_1000: Set(offer.price_at("1000")),
            price_10000: Set(offer.price_at("10000")),
            source_updated: Set(offer.updated.clone()),
            created_at: Set(now),
        }
    }
}

#[async_trait]
impl ProductRepository for ProductRepositoryImpl {
    async fn insert_products(
        &self,
        envelopes: &[ResultEnvelope],
    ) -> Result<Vec<PersistedProduct>, RepositoryError> {
        if envelopes.is_empty() {
            return Ok(Vec::new());
        }

        let now: DateTime<FixedOffset> = Utc::now().into();
        for chunk in envelopes.chunks(INSERT_CHUNK_ROWS) {
            let models: Vec<product::ActiveModel> = chunk
                .iter()
                .map(|envelope| Self::product_model(envelope, now))
                .collect();

            product::Entity::insert_many(models)
                .on_conflict(
                    OnConflict::column(product::Column::CrawlId)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(self.db.as_ref())
                .await?;
        }

        // Rows written by an earlier attempt keep their original id
        let crawl_ids: Vec<Uuid> = envelopes.iter().map(|e| e.crawl_id).collect();
        let mut persisted = Vec::with_capacity(crawl_ids.len());
        for chunk in crawl_ids.chunks(INSERT_CHUNK_ROWS) {
            let rows = product::Entity::find()
                .filter(product::Column::CrawlId.is_in(chunk.to_vec()))
                .all(self.db.as_ref())
                .await?;
            persisted.extend(rows.into_iter().map(|row| PersistedProduct {
                crawl_id: row.crawl_id,
                product_id: row.id,
            }));
        }

        Ok(persisted)
    }

    async fn insert_distributors(&self, rows: &[DistributorRow]) -> Result<u64, RepositoryError> {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let mut inserted = 0;

        for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
            let models: Vec<distributor::ActiveModel> = chunk
                .iter()
                .map(|row| Self::distributor_model(row, now))
                .collect();

            inserted += distributor::Entity::insert_many(models)
                .on_conflict(
                    OnConflict::columns([
                        distributor::Column::ProductId,
                        distributor::Column::Name,
                        distributor::Column::Sku,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(self.db.as_ref())
                .await?;
        }

        Ok(inserted)
    }
}
