//! A validated, read-only snapshot of dimensions and facts.
//!
//! [`Dataset::new`] is the only way in. It checks uniqueness and referential
//! integrity once, resolves every fact's dimension references to indices,
//! and from then on hands out [`JoinedFact`]s that cannot dangle.

use std::{collections::HashMap, hash::Hash};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
  Entity, Error, Result,
  dimension::{Category, Chain, Location, Store, TimePeriod},
  sales::SalesRecord,
};

// ─── Input ───────────────────────────────────────────────────────────────────

/// Every dimension collection, as handed over by an ingestion collaborator.
#[derive(Debug, Clone, Default)]
pub struct Dimensions {
  pub chains:     Vec<Chain>,
  pub locations:  Vec<Location>,
  pub categories: Vec<Category>,
  pub periods:    Vec<TimePeriod>,
  pub stores:     Vec<Store>,
}

// ─── Joined view ─────────────────────────────────────────────────────────────

/// A sales record together with the dimension rows it references.
#[derive(Debug, Clone, Copy)]
pub struct JoinedFact<'a> {
  pub record:   &'a SalesRecord,
  pub store:    &'a Store,
  pub chain:    &'a Chain,
  pub location: &'a Location,
  pub category: &'a Category,
  pub period:   &'a TimePeriod,
}

#[derive(Debug, Clone, Copy)]
struct Links {
  store:    usize,
  chain:    usize,
  location: usize,
  category: usize,
  period:   usize,
}

// ─── Dataset ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Dataset {
  chains:     Vec<Chain>,
  locations:  Vec<Location>,
  categories: Vec<Category>,
  periods:    Vec<TimePeriod>,
  stores:     Vec<Store>,
  sales:      Vec<SalesRecord>,
  links:      Vec<Links>,
}

impl Dataset {
  /// Validate and index a full load.
  ///
  /// Fails on the first duplicate key, dangling reference, or out-of-range
  /// satisfaction score. Facts are keyed by store, category and date.
  /// Nothing is partially loaded.
  pub fn new(dims: Dimensions, sales: Vec<SalesRecord>) -> Result<Self> {
    let chain_ix = unique_index(&dims.chains, Entity::Chain, |c| c.chain_id)?;
    unique_index(&dims.chains, Entity::Chain, |c| c.name.clone())?;
    let location_ix =
      unique_index(&dims.locations, Entity::Location, |l| l.location_id)?;
    let category_ix =
      unique_index(&dims.categories, Entity::Category, |c| c.category_id)?;
    unique_index(&dims.categories, Entity::Category, |c| c.name.clone())?;
    let period_ix: HashMap<NaiveDate, usize> =
      unique_index(&dims.periods, Entity::TimePeriod, |p| p.date)?;
    let store_ix =
      unique_index(&dims.stores, Entity::Store, |s| s.store_id.clone())?;

    // Store -> (chain, location)
    let mut store_links = Vec::with_capacity(dims.stores.len());
    for store in &dims.stores {
      let chain = lookup(&chain_ix, &store.chain_id, Entity::Chain)?;
      let location = lookup(&location_ix, &store.location_id, Entity::Location)?;
      store_links.push((chain, location));
    }

    unique_index(&sales, Entity::SalesRecord, fact_key)?;

    let mut links = Vec::with_capacity(sales.len());
    for record in &sales {
      let store = lookup(&store_ix, &record.store_id, Entity::Store)?;
      let category = lookup(&category_ix, &record.category_id, Entity::Category)?;
      let period = lookup(&period_ix, &record.date, Entity::TimePeriod)?;

      if record.satisfaction_score < Decimal::ZERO
        || record.satisfaction_score > Decimal::from(5)
      {
        return Err(Error::InvalidRecord {
          entity: Entity::SalesRecord,
          key:    fact_key(record),
          reason: format!(
            "satisfaction score {} outside 0.0..=5.0",
            record.satisfaction_score
          ),
        });
      }

      let (chain, location) = store_links[store];
      links.push(Links { store, chain, location, category, period });
    }

    Ok(Self {
      chains: dims.chains,
      locations: dims.locations,
      categories: dims.categories,
      periods: dims.periods,
      stores: dims.stores,
      sales,
      links,
    })
  }

  pub fn chains(&self) -> &[Chain] { &self.chains }

  pub fn locations(&self) -> &[Location] { &self.locations }

  pub fn categories(&self) -> &[Category] { &self.categories }

  pub fn periods(&self) -> &[TimePeriod] { &self.periods }

  pub fn stores(&self) -> &[Store] { &self.stores }

  pub fn sales(&self) -> &[SalesRecord] { &self.sales }

  pub fn is_empty(&self) -> bool { self.sales.is_empty() }

  /// The fact stream with every reference resolved, in load order.
  pub fn joined(&self) -> Vec<JoinedFact<'_>> {
    self
      .sales
      .iter()
      .zip(&self.links)
      .map(|(record, l)| JoinedFact {
        record,
        store: &self.stores[l.store],
        chain: &self.chains[l.chain],
        location: &self.locations[l.location],
        category: &self.categories[l.category],
        period: &self.periods[l.period],
      })
      .collect()
  }
}

fn fact_key(record: &SalesRecord) -> String {
  format!("{}/{}/{}", record.store_id, record.category_id, record.date)
}

fn unique_index<T, K, F>(
  items: &[T],
  entity: Entity,
  key: F,
) -> Result<HashMap<K, usize>>
where
  K: Eq + Hash + ToString,
  F: Fn(&T) -> K,
{
  let mut index = HashMap::with_capacity(items.len());
  for (i, item) in items.iter().enumerate() {
    let k = key(item);
    if index.contains_key(&k) {
      return Err(Error::DuplicateKey { entity, key: k.to_string() });
    }
    index.insert(k, i);
  }
  Ok(index)
}

fn lookup<K>(index: &HashMap<K, usize>, key: &K, entity: Entity) -> Result<usize>
where
  K: Eq + Hash + ToString,
{
  index
    .get(key)
    .copied()
    .ok_or_else(|| Error::ReferentialIntegrity { entity, key: key.to_string() })
}
