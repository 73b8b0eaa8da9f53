use std::fmt;
use std::marker::PhantomData;

use log::{debug, error, info};
use serde::de::{Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;

use crate::error::FetchError;
use crate::model::{Entry, PoiKind};
use crate::sources::CatalogFetcher;
use crate::store::EntrySink;

/// A top-level area (continent) and the floors it is split into.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Area {
    #[serde(default)]
    pub floors: Vec<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Floor {
    #[serde(default, deserialize_with = "keyed_values")]
    pub regions: Vec<Region>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Region {
    #[serde(default, deserialize_with = "keyed_values")]
    pub maps: Vec<MapInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapInfo {
    #[serde(default, deserialize_with = "keyed_values")]
    pub points_of_interest: Vec<PointOfInterest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PointOfInterest {
    pub id: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: PoiKind,
    #[serde(rename = "chat_link", default)]
    pub reference: Option<String>,
}

impl From<PointOfInterest> for Entry {
    fn from(poi: PointOfInterest) -> Self {
        Entry::new(poi.id, poi.name, poi.reference)
    }
}

/// Result of one catalog walk.
#[derive(Debug)]
pub enum LoadOutcome {
    /// Every area was walked; holds the number of entries newly accepted.
    Completed(usize),
    /// The walk stopped at the first fetch failure. Entries accepted before
    /// it stay in the sink.
    Failed(FetchError),
}

/// Walks `area_ids` in order, feeding every waypoint into `sink`.
pub fn load<F, S>(area_ids: &[u32], fetcher: &F, sink: &mut S) -> LoadOutcome
where
    F: CatalogFetcher + ?Sized,
    S: EntrySink + ?Sized,
{
    let mut added = 0;
    match walk(area_ids, fetcher, sink, &mut added) {
        Ok(()) => {
            info!("Catalog: loaded {} waypoints from {} areas", added, area_ids.len());
            LoadOutcome::Completed(added)
        }
        Err(err) => {
            error!("Catalog: load aborted after {} waypoints: {}", added, err);
            LoadOutcome::Failed(err)
        }
    }
}

fn walk<F, S>(area_ids: &[u32], fetcher: &F, sink: &mut S, added: &mut usize) -> Result<(), FetchError>
where
    F: CatalogFetcher + ?Sized,
    S: EntrySink + ?Sized,
{
    for &area_id in area_ids {
        let area = fetcher.area(area_id)?;
        debug!("Catalog: area {} has {} floors", area_id, area.floors.len());

        for &floor_id in &area.floors {
            let floor = fetcher.floor(area_id, floor_id)?;
            let before = *added;

            for region in floor.regions {
                for map in region.maps {
                    for poi in map.points_of_interest {
                        if poi.kind != PoiKind::Waypoint {
                            continue;
                        }
                        if sink.try_add(poi.into()) {
                            *added += 1;
                        }
                    }
                }
            }

            sink.flush();
            debug!("Catalog: area {} floor {}: {} new waypoints", area_id, floor_id, *added - before);
        }
    }
    Ok(())
}

/// Decodes either a JSON array or an id-keyed JSON object into its values,
/// keeping document order.
fn keyed_values<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct KeyedValues<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for KeyedValues<T> {
        type Value = Vec<T>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an array or an id-keyed object")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Vec<T>, A::Error> {
            let mut values = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((_, value)) = map.next_entry::<IgnoredAny, T>()? {
                values.push(value);
            }
            Ok(values)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<T>, A::Error> {
            let mut values = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(value) = seq.next_element()? {
                values.push(value);
            }
            Ok(values)
        }
    }

    deserializer.deserialize_any(KeyedValues(PhantomData))
}
