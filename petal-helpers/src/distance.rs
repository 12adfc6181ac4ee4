use ndarray::ArrayView1;
use std::fmt;

use crate::Float;

#[cfg(feature = "serde")]
use serde_crate::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, MapAccess, Visitor},
    ser::SerializeMap,
};

/// A dissimilarity measure between two feature vectors of equal length.
///
/// `rdistance` is a "reduced" distance that preserves the ordering of
/// `distance` but may be cheaper to compute (for L2 it skips the square
/// root). Ranking code should compare reduced distances and convert back with
/// `rdist_to_dist` only when the true value is needed.
pub trait Distance<F: Float>: Clone + Send + Sync {
    fn distance(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F;

    #[inline]
    fn rdistance(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F {
        self.distance(a, b)
    }

    #[inline]
    fn rdist_to_dist(&self, rdist: F) -> F {
        rdist
    }

    #[inline]
    fn dist_to_rdist(&self, dist: F) -> F {
        dist
    }
}

/// Manhattan (taxicab) distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct L1Dist;

impl<F: Float> Distance<F> for L1Dist {
    #[inline]
    fn distance(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F {
        a.iter().zip(b.iter()).map(|(&x, &y)| (x - y).abs()).sum()
    }
}

/// Euclidean distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct L2Dist;

impl<F: Float> Distance<F> for L2Dist {
    #[inline]
    fn distance(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F {
        self.rdistance(a, b).sqrt()
    }

    #[inline]
    fn rdistance(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F {
        a.iter()
            .zip(b.iter())
            .map(|(&x, &y)| {
                let d = x - y;
                d * d
            })
            .sum()
    }

    #[inline]
    fn rdist_to_dist(&self, rdist: F) -> F {
        rdist.sqrt()
    }

    #[inline]
    fn dist_to_rdist(&self, dist: F) -> F {
        dist * dist
    }
}

/// Chebyshev distance: the largest coordinate difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LInfDist;

impl<F: Float> Distance<F> for LInfDist {
    #[inline]
    fn distance(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F {
        a.iter()
            .zip(b.iter())
            .map(|(&x, &y)| (x - y).abs())
            .fold(F::zero(), |acc, d| if d > acc { d } else { acc })
    }
}

/// Minkowski distance of order `p`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LpDist<F: Float>(pub F);

impl<F: Float> Distance<F> for LpDist<F> {
    #[inline]
    fn distance(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F {
        self.rdist_to_dist(self.rdistance(a, b))
    }

    #[inline]
    fn rdistance(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F {
        a.iter()
            .zip(b.iter())
            .map(|(&x, &y)| (x - y).abs().powf(self.0))
            .sum()
    }

    #[inline]
    fn rdist_to_dist(&self, rdist: F) -> F {
        rdist.powf(F::one() / self.0)
    }

    #[inline]
    fn dist_to_rdist(&self, dist: F) -> F {
        dist.powf(self.0)
    }
}

/// A metric chosen at runtime, e.g. from a configuration file.
///
/// Delegates to the static metric types above so the ranking behaviour is
/// identical whichever form is used.
///
/// With the `serde` feature the parameterless metrics are plain strings
/// (`"manhattan"`) and Minkowski is a one-entry map (`{"minkowski": 3.0}`).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Metric {
    #[default]
    Euclidean,
    Manhattan,
    Chebyshev,
    Minkowski(f64),
}

impl Metric {
    fn order<F: Float>(p: f64) -> F {
        F::from_f64(p).unwrap_or_else(F::one)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Euclidean => write!(f, "euclidean"),
            Metric::Manhattan => write!(f, "manhattan"),
            Metric::Chebyshev => write!(f, "chebyshev"),
            Metric::Minkowski(p) => write!(f, "minkowski (p={})", p),
        }
    }
}

#[cfg(feature = "serde")]
const METRIC_NAMES: &[&str] = &["euclidean", "manhattan", "chebyshev", "minkowski"];

#[cfg(feature = "serde")]
impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Euclidean => serializer.serialize_str("euclidean"),
            Metric::Manhattan => serializer.serialize_str("manhattan"),
            Metric::Chebyshev => serializer.serialize_str("chebyshev"),
            Metric::Minkowski(p) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("minkowski", p)?;
                map.end()
            }
        }
    }
}

#[cfg(feature = "serde")]
struct MetricVisitor;

#[cfg(feature = "serde")]
impl<'de> Visitor<'de> for MetricVisitor {
    type Value = Metric;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a metric name or a map like {minkowski: p}")
    }

    fn visit_str<E: de::Error>(self, name: &str) -> Result<Metric, E> {
        match name {
            "euclidean" => Ok(Metric::Euclidean),
            "manhattan" => Ok(Metric::Manhattan),
            "chebyshev" => Ok(Metric::Chebyshev),
            "minkowski" => Err(E::custom("minkowski needs an order, e.g. {minkowski: 3.0}")),
            other => Err(E::unknown_variant(other, METRIC_NAMES)),
        }
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Metric, A::Error> {
        let Some(name) = map.next_key::<String>()? else {
            return Err(de::Error::invalid_length(0, &self));
        };
        if name != "minkowski" {
            return Err(de::Error::unknown_variant(&name, &["minkowski"]));
        }
        let p: f64 = map.next_value()?;
        if map.next_key::<String>()?.is_some() {
            return Err(de::Error::invalid_length(2, &self));
        }
        Ok(Metric::Minkowski(p))
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Metric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MetricVisitor)
    }
}

impl<F: Float> Distance<F> for Metric {
    fn distance(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F {
        match self {
            Metric::Euclidean => L2Dist.distance(a, b),
            Metric::Manhattan => L1Dist.distance(a, b),
            Metric::Chebyshev => LInfDist.distance(a, b),
            Metric::Minkowski(p) => LpDist(Self::order::<F>(*p)).distance(a, b),
        }
    }

    fn rdistance(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F {
        match self {
            Metric::Euclidean => L2Dist.rdistance(a, b),
            Metric::Manhattan => L1Dist.rdistance(a, b),
            Metric::Chebyshev => LInfDist.rdistance(a, b),
            Metric::Minkowski(p) => LpDist(Self::order::<F>(*p)).rdistance(a, b),
        }
    }

    fn rdist_to_dist(&self, rdist: F) -> F {
        match self {
            Metric::Euclidean => Distance::<F>::rdist_to_dist(&L2Dist, rdist),
            Metric::Manhattan | Metric::Chebyshev => rdist,
            Metric::Minkowski(p) => LpDist(Self::order::<F>(*p)).rdist_to_dist(rdist),
        }
    }

    fn dist_to_rdist(&self, dist: F) -> F {
        match self {
            Metric::Euclidean => Distance::<F>::dist_to_rdist(&L2Dist, dist),
            Metric::Manhattan | Metric::Chebyshev => dist,
            Metric::Minkowski(p) => LpDist(Self::order::<F>(*p)).dist_to_rdist(dist),
        }
    }
}
