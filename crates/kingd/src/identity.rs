//! Ship identities and their canonical phonemic text form.
//!
//! An identity is a 128-bit address. Its external spelling is built from
//! 16-bit words, each rendered as a prefix syllable followed by a suffix
//! syllable, with `-` between words and `--` between 64-bit groups. Values
//! below 256 render as a lone suffix (`~zod`). Parsing accepts only the
//! canonical spelling, so `~dozzod` is rejected in favour of `~zod`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const PREFIXES: &str = "\
dozmarbinwansamlitsighidfidlissogdirwacsabwissibrigsoldopmodfoglidhopdardorlorhodfolrintogsilmir\
holpaslacrovlivdalsatlibtabhanticpidtorbolfosdotlosdilforpilramtirwintadbicdifrocwidbisdasmidlop\
rilnardapmolsanlocnovsitnidtipsicropwitnatpanminritpodmottamtolsavposnapnopsomfinfonbanmorworsip\
ronnorbotwicsocwatdolmagpicdavbidbaltimtasmalligsivtagpadsaldivdactansidfabtarmonranniswolmispal\
lasdismaprabtobrollatlonnodnavfignomnibpagsopralbilhaddocridmocpacravripfaltodtiltinhapmicfanpat\
taclabmogsimsonpinlomrictapfirhasbosbatpochactidhavsaplindibhosdabbitbarracparloddosbortochilmac\
tomdigfilfasmithobharmighinradmashalraglagfadtopmophabnilnosmilfopfamdatnoldinhatnacrisfotribhoc\
nimlarfitwalrapsarnalmoslandondanladdovrivbacpollaptalpitnambonrostonfodponsovnocsorlavmatmipfip";

const SUFFIXES: &str = "\
zodnecbudwessevpersutletfulpensytdurwepserwylsunrypsyxdyrnuphebpeglupdepdysputlughecryttyvsydnex\
lunmeplutseppesdelsulpedtemledtulmetwenbynhexfebpyldulhetmevruttylwydtepbesdexsefwycburderneppur\
rysrebdennutsubpetrulsynregtydsupsemwynrecmegnetsecmulnymtevwebsummutnyxrextebfushepbenmuswyxsym\
selrucdecwexsyrwetdylmynmesdetbetbeltuxtugmyrpelsyptermebsetdutdegtexsurfeltudnuxruxrenwytnubmed\
lytdusnebrumtynseglyxpunresredfunrevrefmectedrusbexlebduxrynnumpyxrygryxfeptyrtustyclegnemfermer\
tenlusnussyltecmexpubrymtucfyllepdebbermughuttunbylsudpemdevlurdefbusbeprunmelpexdytbyttyplevmyl\
wedducfurfexnulluclennerlexrupnedlecrydlydfenwelnydhusrelrudneshesfetdesretdunlernyrsebhulryllud\
remlysfynwerrycsugnysnyllyndyndemluxfedsedbecmunlyrtesmudnytbyrsenwegfyrmurtelreptegpecnelnevfes";

const MAX_WORDS: usize = 8;

/// Size class of an identity, derived from its bit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    /// 8-bit root identity.
    Galaxy,
    /// 16-bit identity issued by a galaxy.
    Star,
    /// 32-bit identity issued by a star.
    Planet,
    /// 64-bit identity derived from a planet.
    Moon,
    /// 128-bit self-minted identity.
    Comet,
}

/// Addressable identity an instance boots as.
///
/// Deliberately not `Copy`: every consumer that retains an identity clones
/// it at the call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(u128);

/// Errors raised while parsing identity text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The text did not start with `~`.
    #[error("identity '{0}' must start with '~'")]
    MissingSigil(String),
    /// A word was not a valid syllable pair.
    #[error("identity '{text}' contains invalid word '{word}'")]
    InvalidWord {
        /// Full input text.
        text: String,
        /// Offending word.
        word: String,
    },
    /// More than 128 bits were spelled.
    #[error("identity '{0}' exceeds 128 bits")]
    TooLong(String),
    /// The text decoded but is not the canonical spelling.
    #[error("identity '{text}' is not canonical; expected '{canonical}'")]
    NonCanonical {
        /// Full input text.
        text: String,
        /// Canonical spelling of the same value.
        canonical: String,
    },
}

impl Identity {
    /// Wraps a raw address.
    #[must_use]
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// Raw address.
    #[must_use]
    pub const fn value(&self) -> u128 {
        self.0
    }

    /// Size class of this identity.
    #[must_use]
    pub const fn rank(&self) -> Rank {
        match self.0 {
            0..=0xff => Rank::Galaxy,
            0x100..=0xffff => Rank::Star,
            0x1_0000..=0xffff_ffff => Rank::Planet,
            0x1_0000_0000..=0xffff_ffff_ffff_ffff => Rank::Moon,
            _ => Rank::Comet,
        }
    }
}

fn syllable(table: &'static str, index: u8) -> &'static str {
    let start = usize::from(index) * 3;
    table.get(start..start + 3).unwrap_or_default()
}

fn syllable_index(table: &'static str, syllable: &str) -> Option<u8> {
    table
        .as_bytes()
        .chunks(3)
        .position(|candidate| candidate == syllable.as_bytes())
        .and_then(|index| u8::try_from(index).ok())
}

fn words(mut value: u128) -> Vec<u16> {
    let mut words = Vec::new();
    while value > 0 {
        words.push(u16::try_from(value & 0xffff).unwrap_or_default());
        value >>= 16;
    }
    words.reverse();
    words
}

impl fmt::Display for Identity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("~")?;
        if let Ok(galaxy) = u8::try_from(self.0) {
            return formatter.write_str(syllable(SUFFIXES, galaxy));
        }
        let words = words(self.0);
        let count = words.len();
        for (index, word) in words.into_iter().enumerate() {
            if index > 0 {
                let separator = if (count - index).is_multiple_of(4) {
                    "--"
                } else {
                    "-"
                };
                formatter.write_str(separator)?;
            }
            let high = u8::try_from(word >> 8).unwrap_or_default();
            let low = u8::try_from(word & 0xff).unwrap_or_default();
            formatter.write_str(syllable(PREFIXES, high))?;
            formatter.write_str(syllable(SUFFIXES, low))?;
        }
        Ok(())
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let body = text
            .strip_prefix('~')
            .ok_or_else(|| IdentityError::MissingSigil(text.to_owned()))?;
        let invalid = |word: &str| IdentityError::InvalidWord {
            text: text.to_owned(),
            word: word.to_owned(),
        };

        let parts: Vec<&str> = body.split('-').filter(|part| !part.is_empty()).collect();
        if parts.len() > MAX_WORDS {
            return Err(IdentityError::TooLong(text.to_owned()));
        }

        let value = match parts.as_slice() {
            [] => return Err(invalid(body)),
            [single] if single.len() == 3 => {
                u128::from(syllable_index(SUFFIXES, single).ok_or_else(|| invalid(single))?)
            }
            words => words.iter().try_fold(0u128, |value, word| {
                let (prefix, suffix) = word
                    .split_at_checked(3)
                    .filter(|(_, suffix)| suffix.len() == 3)
                    .ok_or_else(|| invalid(word))?;
                let high = syllable_index(PREFIXES, prefix).ok_or_else(|| invalid(word))?;
                let low = syllable_index(SUFFIXES, suffix).ok_or_else(|| invalid(word))?;
                Ok((value << 16) | (u128::from(high) << 8) | u128::from(low))
            })?,
        };

        let identity = Self(value);
        let canonical = identity.to_string();
        if canonical != text {
            return Err(IdentityError::NonCanonical {
                text: text.to_owned(),
                canonical,
            });
        }
        Ok(identity)
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
