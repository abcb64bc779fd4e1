//! The closed catalog of privacy dimensions and their request builders.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::llm::ChatMessage;

const CONTENT_SLOT: &str = "{{CONTENT}}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Exposure,
    Inference,
    Audience,
    Platforms,
    Amplification,
    Manipulability,
}

impl Dimension {
    /// Declaration order. Result bundles and reports always follow it.
    pub const ALL: [Dimension; 6] = [
        Dimension::Exposure,
        Dimension::Inference,
        Dimension::Audience,
        Dimension::Platforms,
        Dimension::Amplification,
        Dimension::Manipulability,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn key(self) -> &'static str {
        self.profile().key
    }

    pub fn label(self) -> &'static str {
        self.profile().label
    }

    pub fn codename(self) -> &'static str {
        self.profile().codename
    }

    pub fn profile(self) -> &'static DimensionProfile {
        &PROFILES[self.index()]
    }

    pub fn build_messages(self, submission: &str) -> Vec<ChatMessage> {
        self.profile().build_messages(submission)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Dimension {
    type Err = AppError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        lookup(key).map(|profile| profile.dimension)
    }
}

#[derive(Debug)]
pub struct DimensionProfile {
    pub dimension: Dimension,
    pub key: &'static str,
    pub label: &'static str,
    pub codename: &'static str,
    system_prompt: &'static str,
    user_template: &'static str,
}

impl DimensionProfile {
    /// Framing entry followed by the submission interpolated into the
    /// dimension's template. Pure: the same text always yields the same
    /// messages.
    pub fn build_messages(&self, submission: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system_prompt),
            ChatMessage::user(self.user_template.replacen(CONTENT_SLOT, submission, 1)),
        ]
    }
}

/// Resolves a dimension key to its profile.
pub fn lookup(key: &str) -> Result<&'static DimensionProfile, AppError> {
    PROFILES
        .iter()
        .find(|profile| profile.key == key)
        .ok_or_else(|| AppError::UnknownDimension(key.to_string()))
}

static PROFILES: [DimensionProfile; 6] = [
    DimensionProfile {
        dimension: Dimension::Exposure,
        key: "exposure",
        label: "Exposure",
        codename: "Exposure Sentinel",
        system_prompt: "You are the Exposure Sentinel, a privacy analyst who finds direct \
            identifiers, metadata trails and clues that link posts across accounts. \
            Answer in clear professional English with a calm, candid tone.",
        user_template: "Review the submission below only through the EXPOSURE lens.\n\n\
            Submission:\n\"\"\"\n{{CONTENT}}\n\"\"\"\n\n\
            Write at most 100 words of plain text (no Markdown), as sentences separated by \
            semicolons, in this order: Risk Verdict (High / Medium / Low and why); \
            Signals Detected (quote three concrete snippets); Mitigation (two sentences of \
            specific redaction or obfuscation advice).\n",
    },
    DimensionProfile {
        dimension: Dimension::Inference,
        key: "inference",
        label: "Inference",
        codename: "Inference Profiler",
        system_prompt: "You are the Inference Profiler, trained to deduce hidden traits such as \
            emotions, health, finances and relationships from subtle cues.",
        user_template: "Analyze the submission with an INFERENCE mindset.\n\n\
            Submission:\n\"\"\"\n{{CONTENT}}\n\"\"\"\n\n\
            Write at most 100 words of plain text (no Markdown) covering: Deduced Traits \
            (three short clauses naming each trait and its clue); Sensitivity Check (rate each \
            trait low, medium or high); Containment (a short paragraph on closing those \
            inference paths).\n",
    },
    DimensionProfile {
        dimension: Dimension::Audience,
        key: "audience",
        label: "Audience & Consequences",
        codename: "Audience Forecaster",
        system_prompt: "You are the Audience Forecaster. You map how content can reach \
            unintended communities and what fallout follows.",
        user_template: "Evaluate who could realistically encounter this submission and what \
            happens next.\n\n\
            Submission:\n\"\"\"\n{{CONTENT}}\n\"\"\"\n\n\
            Write at most 100 words of plain text (no Markdown) in this sequence: Audience Map \
            (three audience clusters and how they gain access); Consequence Radar (the likely \
            outcomes as running text); Safeguard Moves (two tactics that keep reach aligned \
            with intent).\n",
    },
    DimensionProfile {
        dimension: Dimension::Platforms,
        key: "platforms",
        label: "Platforms & Rules",
        codename: "Platform Arbiter",
        system_prompt: "You are the Platform Arbiter, fluent in content policy, data retention \
            and recommender behavior across social and user-generated content networks.",
        user_template: "Review the submission through the PLATFORMS & RULES dimension.\n\n\
            Submission:\n\"\"\"\n{{CONTENT}}\n\"\"\"\n\n\
            Write at most 100 words of plain text (no Markdown) addressing: Policy Touchpoints \
            (two or three policy areas at risk); Data Lifecycle (how storage, replication or \
            third-party sharing could raise the risk); Governance Advice (concrete settings or \
            compliance changes that stay within the rules).\n",
    },
    DimensionProfile {
        dimension: Dimension::Amplification,
        key: "amplification",
        label: "Amplification",
        codename: "Amplification Radar",
        system_prompt: "You are the Amplification Radar. You predict virality mechanics, \
            meme formation and outrage cascades.",
        user_template: "Estimate how and why the submission could spread further than its \
            author expects.\n\n\
            Submission:\n\"\"\"\n{{CONTENT}}\n\"\"\"\n\n\
            Write at most 100 words of plain text (no Markdown) including: Traction Triggers \
            (three factors such as tone, timing, novelty or community cues); Escalation Paths \
            (a short paragraph on likely share chains or algorithmic hooks); Dampeners \
            (practical levers that keep circulation under control).\n",
    },
    DimensionProfile {
        dimension: Dimension::Manipulability,
        key: "manipulability",
        label: "Manipulability",
        codename: "Manipulability Watch",
        system_prompt: "You are Manipulability Watch, specializing in remix, deepfake and \
            out-of-context risks.",
        user_template: "Examine how the submission could be distorted, excerpted or combined \
            with other data.\n\n\
            Submission:\n\"\"\"\n{{CONTENT}}\n\"\"\"\n\n\
            Write at most 100 words of plain text (no Markdown) covering: Attack Surface (three \
            manipulation scenarios such as quote-mining, AI remixing or synthetic pairing); \
            Impact Window (the harm those distortions cause); Hardening Tips (practical \
            defenses such as watermarking, rephrasing or access limits).\n",
    },
];
