// # Short-Range Feed Extractor
//
// This crate extracts the near-term series from the XML "inform"
// feed: one current-conditions reading (the fact) plus four forecast
// slots at fixed 6-hour increments.
//
// ## Document Contract
//
// One `<weather>` root containing one `<location>`; inside it exactly
// one `<fact>` and exactly four `<forecast>` nodes, each carrying one
// nested `<values>` node with the temperature in its `t` attribute.
// The fact and forecast nodes carry the slot index in `tod` and a
// wall-clock timestamp in `valid`. Any deviation in cardinality or a
// missing attribute is a fatal schema mismatch -- the extractor never
// guesses around a changed feed.
//
// ## Known Feed Quirks
//
// - `valid` timestamps sometimes render the hour with a single digit;
//   the normalizer repairs them before parsing.
// - The fact node occasionally reports a negative `tod`; it is clamped
//   to slot 0, matching what the feed means by it.

use async_trait::async_trait;
use roxmltree::{Document, Node};

use meteo_core::error::{Error, Result};
use meteo_core::series::{Label, Observation, Series, Slot, STEP_SECS};
use meteo_core::time::{self, Zone};
use meteo_core::traits::{DocumentFetcher, ShortRangeSource};

/// Feed name used in error messages.
const FEED: &str = "inform";

/// Number of forward slots the feed reports.
const FORECAST_COUNT: usize = 4;

/// Forward offsets, in hours, a forecast node may land on.
const VALID_OFFSETS: [i64; 4] = [6, 12, 18, 24];

/// Short-range feed component: fetches the XML document and extracts
/// the fact-anchored series from it.
pub struct InformSource {
    fetcher: Box<dyn DocumentFetcher>,
    url: String,
    zone: Zone,
}

impl InformSource {
    /// Create a new short-range source.
    ///
    /// # Parameters
    ///
    /// - `fetcher`: Document retrieval implementation
    /// - `url`: Endpoint serving the XML feed
    /// - `zone`: Timezone the feed's wall-clock values are expressed in
    pub fn new(fetcher: Box<dyn DocumentFetcher>, url: impl Into<String>, zone: Zone) -> Self {
        Self {
            fetcher,
            url: url.into(),
            zone,
        }
    }
}

#[async_trait]
impl ShortRangeSource for InformSource {
    async fn series(&self) -> Result<Series> {
        let xml = self.fetcher.fetch(&self.url).await?;
        extract(&xml, self.zone)
    }
}

/// Extract the short-range series from an XML document.
///
/// Emits the fact entry first, then the four forecast entries in
/// document order, labeled `h_<offset>` with the offset computed from
/// slot arithmetic: a forecast slot no later in the day than the fact
/// slot belongs to the next calendar day.
pub fn extract(xml: &str, zone: Zone) -> Result<Series> {
    let doc = Document::parse(xml)
        .map_err(|e| Error::schema(FEED, format!("unparseable document: {e}")))?;

    let root = doc.root_element();
    if root.tag_name().name() != "weather" {
        return Err(Error::schema(
            FEED,
            format!("root element is <{}>, expected <weather>", root.tag_name().name()),
        ));
    }
    let location = one_child(root, "location")?;
    let fact = one_child(location, "fact")?;
    let fact_values = one_child(fact, "values")?;
    let forecasts = children_exact(location, "forecast", FORECAST_COUNT)?;

    let fact_day = time::parse_feed_datetime(attr(fact, "valid")?, FEED, "fact valid")?.date();
    let fact_slot = Slot::from_fact_index(attr(fact, "tod")?.parse().unwrap_or(-1));
    let fact_instant = zone.slot_instant(fact_day, fact_slot)?;
    tracing::debug!("fact reading anchors the series at {fact_instant}");

    let mut series = Series::new();
    series.push(Observation::new(
        Label::Fact,
        temperature(fact_values)?,
        fact_instant,
    ));

    for node in forecasts {
        let values = one_child(node, "values")?;
        let tod = attr(node, "tod")?;
        let slot = Slot::new(tod.parse().map_err(|_| {
            Error::schema(FEED, format!("bad forecast slot index {tod:?}"))
        })?)?;

        // The slot recurs tomorrow when it is not later in the day than
        // the fact slot.
        let day = if slot.index() <= fact_slot.index() {
            fact_day.succ_opt().ok_or_else(|| {
                Error::consistency(format!("no calendar day after {fact_day}"))
            })?
        } else {
            fact_day
        };

        let instant = zone.slot_instant(day, slot)?;
        let delta_secs = (instant - fact_instant).num_seconds();
        if delta_secs % STEP_SECS != 0 {
            return Err(Error::consistency(format!(
                "forecast instant {instant} is {delta_secs}s after the fact instant {fact_instant}, not a multiple of {STEP_SECS}s"
            )));
        }
        let offset = delta_secs / 3600;
        if !VALID_OFFSETS.contains(&offset) {
            return Err(Error::consistency(format!(
                "forecast offset {offset}h is outside the expected set {VALID_OFFSETS:?}"
            )));
        }

        series.push(Observation::new(
            Label::forecast(offset as u32)?,
            temperature(values)?,
            instant,
        ));
    }

    Ok(series)
}

/// The single `name` element child of `parent`, or a schema error.
fn one_child<'a, 'd>(parent: Node<'a, 'd>, name: &str) -> Result<Node<'a, 'd>> {
    let found = children_named(parent, name);
    match found.as_slice() {
        [node] => Ok(*node),
        _ => Err(Error::schema(
            FEED,
            format!(
                "expected exactly one <{name}> under <{}>, found {}",
                parent.tag_name().name(),
                found.len()
            ),
        )),
    }
}

/// Exactly `count` `name` element children of `parent`, or a schema error.
fn children_exact<'a, 'd>(
    parent: Node<'a, 'd>,
    name: &str,
    count: usize,
) -> Result<Vec<Node<'a, 'd>>> {
    let found = children_named(parent, name);
    if found.len() != count {
        return Err(Error::schema(
            FEED,
            format!(
                "expected {count} <{name}> under <{}>, found {}",
                parent.tag_name().name(),
                found.len()
            ),
        ));
    }
    Ok(found)
}

fn children_named<'a, 'd>(parent: Node<'a, 'd>, name: &str) -> Vec<Node<'a, 'd>> {
    parent
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == name)
        .collect()
}

fn attr<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str> {
    node.attribute(name).ok_or_else(|| {
        Error::schema(
            FEED,
            format!("<{}> is missing its {name} attribute", node.tag_name().name()),
        )
    })
}

fn temperature(values: Node<'_, '_>) -> Result<f64> {
    let text = attr(values, "t")?;
    text.parse()
        .map_err(|_| Error::temperature(FEED, text))
}
