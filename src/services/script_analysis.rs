// src/services/script_analysis.rs
//! Script analysis: breaks a raw script into characters and timed scenes.
//! Uses OpenAI when configured, with a deterministic fallback breakdown so
//! the pipeline always has something to render.

use crate::openai_client::OpenAiClient;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptAnalysis {
    pub theme: String,
    pub mood: String,
    pub total_duration: u32,
    pub characters: Vec<AnalyzedCharacter>,
    pub scenes: Vec<AnalyzedScene>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedCharacter {
    pub name: String,
    pub role: String,
    pub personality: String,
    pub appearance: String,
    pub voice_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedScene {
    pub scene_number: u32,
    pub title: String,
    pub description: String,
    pub duration: u32,
    pub dialogue: Vec<DialogueLine>,
    pub visual_elements: Vec<String>,
    pub background_music: String,
    pub camera_angles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueLine {
    pub character: String,
    pub text: String,
    pub emotion: String,
}

/// Analyze a script, targeting `target_length_minutes` of video in `style`.
/// Never fails: provider errors fall back to a basic breakdown.
pub async fn analyze_script(
    client: Option<&OpenAiClient>,
    script_text: &str,
    target_length_minutes: u32,
    style: &str,
) -> ScriptAnalysis {
    tracing::info!(
        script_length = script_text.len(),
        target_length_minutes,
        style,
        "Analyzing script"
    );

    let Some(client) = client else {
        tracing::warn!("OpenAI client not configured, using fallback analysis");
        return fallback_analysis(script_text, target_length_minutes);
    };

    let prompt = build_analysis_prompt(script_text, target_length_minutes, style);
    let system = "You are an expert video production AI that outputs only valid JSON.";

    match client.json_completion(system, &prompt).await {
        Ok(content) => match serde_json::from_str::<ScriptAnalysis>(&content) {
            Ok(analysis) => {
                tracing::info!(
                    character_count = analysis.characters.len(),
                    scene_count = analysis.scenes.len(),
                    total_duration = analysis.total_duration,
                    "Script analysis complete"
                );
                analysis
            }
            Err(e) => {
                tracing::error!("Failed to parse script analysis JSON: {}", e);
                fallback_analysis(script_text, target_length_minutes)
            }
        },
        Err(e) => {
            tracing::error!("Script analysis request failed: {}", e);
            fallback_analysis(script_text, target_length_minutes)
        }
    }
}

fn build_analysis_prompt(script_text: &str, target_length_minutes: u32, style: &str) -> String {
    let target_seconds = target_length_minutes * 60;
    format!(
        r#"You are an expert AI script analyzer and video production assistant. Analyze the following script and create a detailed breakdown for a {target_length_minutes}-minute animated video in {style} style.

Script:
"""
{script_text}
"""

Your task:
1. Identify all main characters with detailed descriptions
2. Break the script into scenes that total approximately {target_seconds} seconds ({target_length_minutes} minutes)
3. For each scene, provide scene number and title, a detailed description, duration in seconds (durations must add up to {target_seconds} seconds), complete dialogue with character names and emotions, visual elements, background music suggestions, and camera angles
4. Each scene should be 30-120 seconds long

Respond ONLY with valid JSON in this exact format:
{{
  "theme": "overall theme",
  "mood": "overall mood",
  "totalDuration": {target_seconds},
  "characters": [
    {{
      "name": "Character Name",
      "role": "protagonist/antagonist/supporting",
      "personality": "brief personality description",
      "appearance": "detailed visual description for {style} style",
      "voiceType": "voice characteristics (deep/soft/energetic/etc)"
    }}
  ],
  "scenes": [
    {{
      "sceneNumber": 1,
      "title": "Scene Title",
      "description": "What happens in this scene",
      "duration": 45,
      "dialogue": [
        {{
          "character": "Character Name",
          "text": "What they say",
          "emotion": "happy/sad/angry/neutral/excited/etc"
        }}
      ],
      "visualElements": ["element1", "element2"],
      "backgroundMusic": "music mood/type",
      "cameraAngles": ["wide shot", "close up"]
    }}
  ]
}}"#
    )
}

/// Basic breakdown used when the AI provider is unavailable: the script is
/// split evenly over max(target/2, 5) narrated scenes.
pub fn fallback_analysis(script_text: &str, target_length_minutes: u32) -> ScriptAnalysis {
    let target_seconds = target_length_minutes * 60;
    let scene_count = (target_length_minutes / 2).max(5);
    let scene_duration = target_seconds / scene_count;

    let words: Vec<&str> = script_text.split_whitespace().collect();
    let words_per_scene = (words.len() / scene_count as usize).max(1);

    let scenes = (0..scene_count)
        .map(|i| {
            let start = (i as usize * words_per_scene).min(words.len());
            let end = ((i as usize + 1) * words_per_scene).min(words.len());
            let chunk = words[start..end].join(" ");

            AnalyzedScene {
                scene_number: i + 1,
                title: format!("Scene {}", i + 1),
                description: truncate(&chunk, 200),
                duration: scene_duration,
                dialogue: vec![DialogueLine {
                    character: "Narrator".to_string(),
                    text: truncate(&chunk, 300),
                    emotion: "neutral".to_string(),
                }],
                visual_elements: vec![
                    "Background scene".to_string(),
                    "Character animation".to_string(),
                ],
                background_music: "ambient".to_string(),
                camera_angles: vec!["medium shot".to_string()],
            }
        })
        .collect();

    ScriptAnalysis {
        theme: "Story".to_string(),
        mood: "narrative".to_string(),
        total_duration: target_seconds,
        characters: vec![AnalyzedCharacter {
            name: "Narrator".to_string(),
            role: "narrator".to_string(),
            personality: "Storytelling".to_string(),
            appearance: "Professional presenter".to_string(),
            voice_type: "clear and articulate".to_string(),
        }],
        scenes,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_script(words: usize) -> String {
        (0..words)
            .map(|i| format!("word{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn fallback_produces_at_least_five_scenes() {
        let analysis = fallback_analysis(&sample_script(50), 1);
        assert_eq!(analysis.scenes.len(), 5);
        assert_eq!(analysis.total_duration, 60);
    }

    #[test]
    fn fallback_scene_count_scales_with_target_length() {
        let analysis = fallback_analysis(&sample_script(2000), 40);
        assert_eq!(analysis.scenes.len(), 20);
        assert_eq!(analysis.total_duration, 2400);
        // Even split: every scene carries the same duration.
        assert!(analysis.scenes.iter().all(|s| s.duration == 120));
    }

    #[test]
    fn fallback_numbers_scenes_sequentially() {
        let analysis = fallback_analysis(&sample_script(500), 10);
        let numbers: Vec<u32> = analysis.scenes.iter().map(|s| s.scene_number).collect();
        assert_eq!(numbers, (1..=5).collect::<Vec<_>>());
    }

    #[test]
    fn fallback_always_has_a_narrator() {
        let analysis = fallback_analysis("a short script", 2);
        assert_eq!(analysis.characters.len(), 1);
        assert_eq!(analysis.characters[0].name, "Narrator");
        for scene in &analysis.scenes {
            assert_eq!(scene.dialogue[0].character, "Narrator");
        }
    }

    #[test]
    fn fallback_truncates_descriptions() {
        let analysis = fallback_analysis(&sample_script(5000), 2);
        for scene in &analysis.scenes {
            assert!(scene.description.chars().count() <= 200);
            assert!(scene.dialogue[0].text.chars().count() <= 300);
        }
    }

    #[test]
    fn analysis_json_uses_camel_case_field_names() {
        let analysis = fallback_analysis("some script text here", 2);
        let json = serde_json::to_value(&analysis).unwrap();
        assert!(json.get("totalDuration").is_some());
        let scene = &json["scenes"][0];
        assert!(scene.get("sceneNumber").is_some());
        assert!(scene.get("visualElements").is_some());
        assert!(scene.get("backgroundMusic").is_some());
    }
}
