pub fn build_extraction_prompt(excerpt: &str) -> String {
    format!(
        r#"Extract entities and relationships from the following document excerpt.

INSTRUCTIONS:
1. Identify key entities (concepts, organizations, people, technologies, documents)
2. Extract relationships between entities
3. Output ONLY valid JSON, nothing else
4. Use the exact schema below

SCHEMA:
{{
  "nodes": [
    {{"id": "Canonical Entity Name", "type": "Concept|Organization|Person|Technology|Document", "summary": "one-sentence summary"}}
  ],
  "edges": [
    {{"source": "Entity A", "target": "Entity B", "relation": "verb phrase"}}
  ]
}}

RULES:
- Use the entity's canonical name as its id, so repeated mentions resolve to one node
- Edge source and target must be node ids from this response
- Relations should be short verb phrases: "depends on", "authored", "describes", etc.
- Output ONLY the JSON object, no markdown, no explanations

TEXT:
{}

JSON OUTPUT:"#,
        excerpt
    )
}
