//! Shared secret authenticating the client to the helper.

use std::fmt;

use rand::Rng;
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

const MIN_WORDS: usize = 3;
const MAX_WORDS: usize = 5;
const SEPARATOR: &str = "-";

const WORDS: &[&str] = &[
	"acorn", "alpine", "amber", "anchor", "apple", "arrow", "aspen", "atlas", "autumn", "badge", "bamboo",
	"banner", "barley", "basil", "beacon", "beaver", "berry", "birch", "bison", "blossom", "bramble", "breeze",
	"brick", "bridge", "brook", "bucket", "cabin", "cactus", "camel", "candle", "canoe", "canyon", "carbon",
	"cargo", "castle", "cedar", "chalk", "cherry", "chess", "cider", "cinder", "citrus", "clover", "cobalt",
	"comet", "copper", "coral", "cotton", "cougar", "crane", "crater", "cricket", "crystal", "cypress", "daisy",
	"dawn", "delta", "desert", "dingo", "dolphin", "dove", "dragon", "drift", "dune", "eagle", "ember",
	"emerald", "engine", "falcon", "fern", "fiddle", "finch", "flint", "forest", "fossil", "fox", "frost",
	"galaxy", "garden", "garnet", "gecko", "geyser", "ginger", "glacier", "granite", "gravel", "harbor",
	"hazel", "heron", "hickory", "honey", "horizon", "husky", "iris", "island", "ivory", "jade", "jasper",
	"jelly", "juniper", "kayak", "kelp", "kettle", "kiwi", "koala", "lagoon", "lantern", "larch", "lemon",
	"lily", "linen", "lizard", "llama", "lotus", "lunar", "magnet", "mango", "maple", "marble", "marsh",
	"meadow", "melon", "meteor", "mint", "mirror", "monsoon", "moose", "moss", "mountain", "mulberry", "nectar",
	"nickel", "nutmeg", "oasis", "ocean", "olive", "onyx", "orbit", "orchid", "otter", "owl", "paddle", "panda",
	"papaya", "parrot", "pebble", "pepper", "pigeon", "pine", "planet", "plum", "pollen", "poppy", "prairie",
	"prism", "pumpkin", "quail", "quartz", "quill", "rabbit", "radish", "raven", "reef", "ribbon", "river",
	"robin", "rocket", "saffron", "salmon", "sapphire", "satin", "sequoia", "shadow", "shell", "sierra",
	"silver", "sparrow", "spruce", "squid", "starling", "stone", "summit", "sunset", "swallow", "tangerine",
	"teal", "thistle", "thunder", "tiger", "timber", "topaz", "tulip", "tundra", "turtle", "umber", "valley",
	"velvet", "violet", "walnut", "walrus", "willow", "wombat", "yarrow", "zephyr", "zinc", "basin", "bluff",
	"cove", "creek", "fjord", "grove", "knoll", "ledge", "mesa", "pond", "ridge", "shoal", "spire", "thicket",
	"vale", "atoll", "bayou", "crest", "dell", "glade", "heath", "islet", "moor", "peak", "rapid", "sound",
	"strait", "tarn", "beetle", "bobcat", "condor", "coyote", "ferret", "hornet", "jaguar", "lemur", "lynx",
	"marten", "mink", "newt", "ocelot", "puffin", "rook", "stoat", "tapir", "viper", "wren", "yak", "cliff",
	"orca", "spark",
];

/// Hyphen-joined dictionary words, easy to read out and type on a device.
///
/// `Debug` never prints the secret; use [`Token::expose`] where the clear
/// text is genuinely needed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Draws 3 to 5 words from the embedded list using the OS random source.
	pub fn generate() -> Self {
		let mut rng = OsRng;
		let count = rng.gen_range(MIN_WORDS..=MAX_WORDS);
		let words: Vec<&str> = (0..count).filter_map(|_| WORDS.choose(&mut rng).copied()).collect();
		Self(words.join(SEPARATOR))
	}

	pub fn is_empty(&self) -> bool {
		self.0.trim().is_empty()
	}

	pub fn expose(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Token(<redacted>)")
	}
}
