use std::path::Path;

use rstest::rstest;
use similar_asserts::assert_eq;
use tracing_test::traced_test;

use super::*;
use crate::script::scan_imports;

const CAT_SOURCE: &str = r#"<img src="./cat.png" alt="A cat">"#;

fn cat_config() -> EnhanceConfig {
	EnhanceConfig {
		widths: vec![480, 768],
		main_width: 1024,
		..EnhanceConfig::default()
	}
}

fn specifiers(output: &EnhanceOutput) -> Vec<&str> {
	output
		.imports
		.iter()
		.map(|import| import.specifier.as_str())
		.collect()
}

fn bindings(output: &EnhanceOutput) -> Vec<&str> {
	output
		.imports
		.iter()
		.map(|import| import.binding.as_str())
		.collect()
}

#[test]
fn scan_elements_with_parent_links() -> EnhanceResult<()> {
	let input = r#"<div><picture><img src="a.png"></picture></div>"#;
	let document = scan(input)?;

	let names: Vec<&str> = document.elements.iter().map(|e| e.name.as_str()).collect();
	assert_eq!(names, vec!["div", "picture", "img"]);
	assert_eq!(document.elements[0].parent, None);
	assert_eq!(document.elements[1].parent, Some(0));
	assert_eq!(document.elements[2].parent, Some(1));
	assert!(document.has_ancestor(2, "picture"));
	assert!(!document.has_ancestor(1, "picture"));

	let picture = &document.elements[1];
	assert_eq!(picture.span.slice(input), r#"<picture><img src="a.png"></picture>"#);
	assert_eq!(document.elements[2].span.slice(input), r#"<img src="a.png">"#);

	Ok(())
}

#[test]
fn scan_skips_comments_and_expressions() -> EnhanceResult<()> {
	let input = r#"<!-- <img src="hidden.png"> -->{#if a < b}<img src="shown.png">{/if}"#;
	let document = scan(input)?;

	assert_eq!(document.elements.len(), 1);
	assert_eq!(document.elements[0].static_attribute("src"), Some("shown.png"));

	Ok(())
}

#[test]
fn scan_attribute_values() -> EnhanceResult<()> {
	let input = r#"<img src="a.png" alt='x' {width} {...rest} data-x={y} title="a {b}" hidden loading=lazy>"#;
	let document = scan(input)?;
	let element = &document.elements[0];

	assert_eq!(element.static_attribute("src"), Some("a.png"));
	assert_eq!(element.static_attribute("alt"), Some("x"));
	assert!(element.attribute_value("width").is_dynamic());
	assert!(element.attribute_value("data-x").is_dynamic());
	assert!(element.attribute_value("title").is_dynamic());
	assert_eq!(element.static_attribute("hidden"), Some(""));
	assert_eq!(element.static_attribute("loading"), Some("lazy"));
	assert!(element.attribute_value("srcset").is_absent());

	let spread = &element.attributes[3];
	assert_eq!(spread.name, "");
	assert_eq!(spread.span.slice(input), "{...rest}");
	assert_eq!(&input[element.attributes_end..], ">");

	Ok(())
}

#[test]
fn scan_unquoted_value_with_slashes() -> EnhanceResult<()> {
	let input = "<img src=./assets/cat.png/>";
	let document = scan(input)?;
	let element = &document.elements[0];

	assert_eq!(element.static_attribute("src"), Some("./assets/cat.png"));
	assert!(element.self_closing);

	Ok(())
}

#[test]
fn scan_script_contexts() -> EnhanceResult<()> {
	let input = "<script context=\"module\">\n\texport const a = 1;\n</script>\n<script \
	             lang=\"ts\">\n\timport Foo from './Foo.svelte';\n</script>\n";
	let document = scan(input)?;

	assert_eq!(document.scripts.len(), 2);
	assert_eq!(document.scripts[0].context, ScriptContext::Module);
	assert_eq!(document.scripts[1].context, ScriptContext::Instance);

	let script = document.import_script().map(|script| script.context);
	assert_eq!(script, Some(ScriptContext::Instance));

	let import = &document.scripts[1].imports[0];
	assert_eq!(import.span.slice(input), "import Foo from './Foo.svelte';");
	assert_eq!(import.default_binding.as_deref(), Some("Foo"));

	Ok(())
}

#[test]
fn scan_marks_nested_and_typed_scripts() -> EnhanceResult<()> {
	let input = "<svelte:head><script>window.a = 1;</script></svelte:head>\n<script \
	             type=\"application/ld+json\">{}</script>\n<script type=\"module\">\nimport a from \
	             './a.js';\n</script>";
	let document = scan(input)?;
	let flags: Vec<(bool, Option<&str>, bool)> = document
		.scripts
		.iter()
		.map(|script| {
			(
				script.nested,
				script.script_type.as_deref(),
				script.is_component_script(),
			)
		})
		.collect();

	assert_eq!(
		flags,
		vec![
			(true, None, false),
			(false, Some("application/ld+json"), false),
			(false, Some("module"), true),
		]
	);
	assert_eq!(document.imports().count(), 1);

	Ok(())
}

#[test]
fn scan_skips_frontmatter() -> EnhanceResult<()> {
	let input = "---\nimage: <img src=\"./x.gif\">\n---\n<img src=\"./a.gif\">";
	let document = scan(input)?;

	assert_eq!(document.frontmatter, Some(Span::new(0, 35)));
	assert_eq!(document.elements.len(), 1);
	assert_eq!(document.elements[0].static_attribute("src"), Some("./a.gif"));

	let document = scan("intro\n---\ntitle: Hi\n---\n")?;
	assert_eq!(document.frontmatter, None);

	Ok(())
}

#[test]
fn scan_unclosed_script_is_an_error() {
	let result = scan("<script>\nimport a from 'a';\n<img src=\"a.png\">");
	assert!(matches!(
		result,
		Err(EnhanceError::UnclosedRawText { ref tag, offset: 0 }) if tag == "script"
	));
}

#[test]
fn scan_import_declarations() {
	let input = r#"import A, { b as c, type D } from "./x";
import * as ns from 'y';
import "side-effect";
import type { T } from "./types";
const lazy = import("./dynamic");
const url = import.meta.url;
function f() { import("nested"); }
// import commented from "nope";
"#;
	let imports = scan_imports(input);

	let specifiers: Vec<&str> = imports.iter().map(|i| i.specifier.as_str()).collect();
	assert_eq!(specifiers, vec!["./x", "y", "side-effect", "./types"]);
	assert_eq!(imports[0].default_binding.as_deref(), Some("A"));
	assert_eq!(imports[0].local_names, vec!["A", "c", "D"]);
	assert_eq!(imports[1].default_binding, None);
	assert_eq!(imports[1].local_names, vec!["ns"]);
	assert!(imports[2].local_names.is_empty());
	assert_eq!(imports[3].local_names, vec!["T"]);
}

#[rstest]
#[case::relative("./cat.png", "./cat.png", "png", AssetKind::TransformableRaster)]
#[case::assets_prefix("assets/cat.png", "./assets/cat.png", "png", AssetKind::TransformableRaster)]
#[case::root_absolute("/static/cat.jpg", "/static/cat.jpg", "jpg", AssetKind::TransformableRaster)]
#[case::encoded("./my%20cat.JPG", "./my cat.JPG", "jpg", AssetKind::TransformableRaster)]
#[case::fragment("./anim.gif#frame", "./anim.gif", "gif", AssetKind::AnimatedRaster)]
#[case::query("./a.png?v=2", "./a.png?v=2", "png", AssetKind::TransformableRaster)]
#[case::svg("./logo.svg", "./logo.svg", "svg", AssetKind::PassthroughFormat)]
#[case::webp("./photo.webp", "./photo.webp", "webp", AssetKind::PassthroughFormat)]
#[case::video("./clip.MP4", "./clip.MP4", "mp4", AssetKind::Video)]
#[case::https("https://cdn.example.com/a.png", "https://cdn.example.com/a.png", "png", AssetKind::External)]
#[case::protocol_relative("//cdn.example.com/a.png", "//cdn.example.com/a.png", "png", AssetKind::External)]
#[case::custom_scheme("asset:cat.png", "asset:cat.png", "png", AssetKind::External)]
#[case::invalid_utf8("./a%FF.png", "./a%FF.png", "png", AssetKind::TransformableRaster)]
fn classify_asset_references(
	#[case] raw: &str,
	#[case] url: &str,
	#[case] extension: &str,
	#[case] kind: AssetKind,
) {
	let asset = AssetReference::parse(raw);
	let asset = asset.as_ref();

	assert_eq!(asset.map(|a| a.url.as_str()), Some(url));
	assert_eq!(asset.map(|a| a.extension.as_str()), Some(extension));
	assert_eq!(asset.map(|a| a.kind), Some(kind));
}

#[rstest]
#[case::empty("")]
#[case::whitespace("   ")]
#[case::only_fragment("#top")]
fn classify_empty_sources(#[case] raw: &str) {
	assert_eq!(AssetReference::parse(raw), None);
}

#[test]
fn width_set_is_sorted_union_with_main_width() -> EnhanceResult<()> {
	let widths = WidthSet::new(&[480, 768, 1024], 902)?;
	assert_eq!(*widths, vec![480, 768, 902, 1024]);
	assert_eq!(widths.to_string(), "480;768;902;1024");

	let widths = WidthSet::new(&[1024, 480, 1024], 1024)?;
	assert_eq!(*widths, vec![480, 1024]);

	let widths = WidthSet::new(&[], 640)?;
	assert_eq!(*widths, vec![640]);

	Ok(())
}

#[test]
fn width_set_rejects_zero() {
	assert!(matches!(
		WidthSet::new(&[0, 480], 1280),
		Err(EnhanceError::InvalidWidth(0))
	));
	assert!(matches!(
		WidthSet::new(&[480], 0),
		Err(EnhanceError::InvalidWidth(0))
	));
}

#[rstest]
#[case::simple("./cat.png", "__media_cat_png")]
#[case::nested("./assets/my cat.png", "__media_assets_my_cat_png")]
#[case::root("/static/hero-1.jpg", "__media_static_hero_1_jpg")]
fn identifier_bases(#[case] path: &str, #[case] expected: &str) {
	assert_eq!(identifier_base(path), expected);
}

#[test]
fn edit_list_applies_in_offset_order() -> EnhanceResult<()> {
	let source = "abcdef";
	let mut edits = EditList::new();
	edits.replace(Span::new(4, 5), "E");
	edits.insert(0, "<");
	edits.remove(Span::new(1, 3));
	edits.insert(6, ">");
	edits.insert(6, "!");

	assert_eq!(edits.len(), 5);
	assert_eq!(edits.apply(source)?, "<adEf>!");

	Ok(())
}

#[test]
fn edit_list_rejects_overlaps() {
	let mut edits = EditList::new();
	edits.replace(Span::new(0, 4), "x");
	edits.replace(Span::new(2, 6), "y");

	assert!(matches!(
		edits.apply("abcdef"),
		Err(EnhanceError::OverlappingEdits { .. })
	));

	let mut edits = EditList::new();
	edits.replace(Span::new(0, 4), "x");
	edits.insert(2, "y");

	assert!(matches!(
		edits.apply("abcdef"),
		Err(EnhanceError::OverlappingEdits { .. })
	));
}

#[test]
fn edit_list_rejects_out_of_bounds() {
	let mut edits = EditList::new();
	edits.replace(Span::new(2, 10), "x");

	assert!(matches!(
		edits.apply("abc"),
		Err(EnhanceError::EditOutOfBounds(_))
	));
}

#[test]
fn binding_table_is_seeded_from_default_imports() -> EnhanceResult<()> {
	let document = scan(
		"<script>\nimport cat from './cat.gif';\nimport { a as dog } from './dog';\n</script>",
	)?;
	let mut table = BindingTable::from_document(&document);

	assert_eq!(table.get("./cat.gif"), Some("cat"));
	assert!(table.is_seeded("./cat.gif"));
	assert!(table.is_reserved("dog"));
	assert_eq!(table.get("./dog"), None);

	assert_eq!(table.resolve("./cat.gif", "__media_cat_gif"), "cat");
	assert_eq!(table.resolve("./dog.png", "dog"), "dog_2");
	assert_eq!(table.resolve("./dog.png", "other"), "dog_2");
	assert_eq!(table.minted().len(), 1);

	Ok(())
}

#[test]
fn cat_scenario() -> EnhanceResult<()> {
	let output = enhance_source(CAT_SOURCE, &cat_config())?;

	assert_eq!(
		specifiers(&output),
		vec![
			"./cat.png",
			"./cat.png?w=480;768;1024&format=avif&as=srcset&withoutEnlargement",
			"./cat.png?w=480;768;1024&format=webp&as=srcset&withoutEnlargement",
			"./cat.png?as=meta:width;height",
		]
	);
	assert_eq!(
		bindings(&output),
		vec![
			"__media_cat_png",
			"__media_cat_png_avifSet",
			"__media_cat_png_webpSet",
			"__media_cat_png_meta",
		]
	);
	assert_eq!(output.rewritten, 1);
	assert_eq!(output.plans.len(), 1);

	let plan = &output.plans[0];
	assert!(plan.has_srcset());
	assert!(plan.has_metadata());
	assert!(!plan.is_gif());

	insta::assert_snapshot!(output.code, @r#"
	<script>
	import __media_cat_png from "./cat.png";
	import __media_cat_png_avifSet from "./cat.png?w=480;768;1024&format=avif&as=srcset&withoutEnlargement";
	import __media_cat_png_webpSet from "./cat.png?w=480;768;1024&format=webp&as=srcset&withoutEnlargement";
	import __media_cat_png_meta from "./cat.png?as=meta:width;height";
	</script>

	<picture><source srcset={__media_cat_png_avifSet} type="image/avif" sizes="(min-width: 1024px) 1024px, 100vw" /><source srcset={__media_cat_png_webpSet} type="image/webp" sizes="(min-width: 1024px) 1024px, 100vw" /><img src={__media_cat_png} alt="A cat" class="enhanced-media" loading="lazy" decoding="async" width={__media_cat_png_meta.width} height={__media_cat_png_meta.height} /></picture>
	"#);

	Ok(())
}

#[test]
fn enhancing_twice_is_idempotent() -> EnhanceResult<()> {
	let config = cat_config();
	let first = enhance_source(CAT_SOURCE, &config)?;
	let second = enhance_source(&first.code, &config)?;

	assert_eq!(second.code, first.code);
	assert!(second.imports.is_empty());
	assert_eq!(second.rewritten, 0);

	Ok(())
}

#[test]
fn shared_source_is_imported_once() -> EnhanceResult<()> {
	let input = r#"<img src="./a.png"><p>text</p><img src="./a.png" alt="again">"#;
	let output = enhance_source(input, &EnhanceConfig::default())?;

	assert_eq!(output.imports.len(), 4);
	assert_eq!(output.plans.len(), 1);
	assert_eq!(output.rewritten, 2);
	assert_eq!(output.code.matches("<picture>").count(), 2);
	assert_eq!(output.code.matches("src={__media_a_png}").count(), 2);
	assert_eq!(output.code.matches("import __media_a_png from").count(), 1);

	Ok(())
}

#[test]
fn existing_imports_are_reused() -> EnhanceResult<()> {
	let input = "<script>\n\timport cat from './cat.gif';\n</script>\n\n<img src=\"./cat.gif\">";
	let output = enhance_source(input, &EnhanceConfig::default())?;

	assert!(output.imports.is_empty());
	assert_eq!(
		output.code,
		"<script>\n\timport cat from './cat.gif';\n</script>\n\n<img src={cat} \
		 class=\"enhanced-media\" loading=\"lazy\" decoding=\"async\">"
	);

	Ok(())
}

#[rstest]
#[case::https(r#"<img src="https://example.com/a.png" alt="remote">"#)]
#[case::protocol_relative(r#"<img src="//example.com/a.png">"#)]
#[case::data(r#"<img src="data:image/png;base64,AAAA">"#)]
fn external_sources_are_untouched(#[case] input: &str) -> EnhanceResult<()> {
	let output = enhance_source(input, &EnhanceConfig::default())?;

	assert_eq!(output.code, input);
	assert!(output.imports.is_empty());
	assert_eq!(output.skipped.len(), 1);
	assert_eq!(output.skipped[0].reason, SkipReason::External);

	Ok(())
}

#[test]
fn gif_keeps_its_format() -> EnhanceResult<()> {
	let input = r#"<img src="./party.gif" alt="party">"#;
	let output = enhance_source(input, &EnhanceConfig::default())?;

	assert_eq!(specifiers(&output), vec!["./party.gif"]);
	assert!(output.plans[0].is_gif());
	assert!(!output.plans[0].has_srcset());
	assert!(!output.code.contains("<picture>"));
	assert!(!output.code.contains("format="));
	assert!(output.code.ends_with(
		r#"<img src={__media_party_gif} alt="party" class="enhanced-media" loading="lazy" decoding="async">"#
	));

	Ok(())
}

#[test]
fn passthrough_formats_are_rewritten_in_place() -> EnhanceResult<()> {
	let input = r#"<img src="./logo.svg" class="logo" loading="eager" />"#;
	let output = enhance_source(input, &EnhanceConfig::default())?;

	assert!(output.plans[0].is_passthrough_format());
	assert!(output.code.ends_with(
		r#"<img src={__media_logo_svg} class="logo enhanced-media" loading="eager" decoding="async" />"#
	));

	Ok(())
}

#[test]
fn authored_dimensions_are_preserved() -> EnhanceResult<()> {
	let input = r#"<img src="./a.png" width="10">"#;
	let output = enhance_source(input, &EnhanceConfig::default())?;

	assert!(output.code.contains(r#"width="10""#));
	assert!(!output.code.contains("width={__media_a_png_meta.width}"));
	assert!(output.code.contains("height={__media_a_png_meta.height}"));

	Ok(())
}

#[test]
fn authored_attributes_are_not_clobbered() -> EnhanceResult<()> {
	let input = r#"<img src="./a.png" alt="" loading="eager" decoding="sync" class="hero {extra}" data-id={id} {...rest}>"#;
	let output = enhance_source(input, &EnhanceConfig::default())?;

	assert!(output.code.contains(
		r#"<img src={__media_a_png} alt="" loading="eager" decoding="sync" class="hero {extra}" data-id={id} {...rest} width={__media_a_png_meta.width}"#
	));
	assert_eq!(output.code.matches("alt=").count(), 1);
	assert_eq!(output.code.matches("loading=").count(), 1);

	Ok(())
}

#[test]
fn static_classes_are_merged() -> EnhanceResult<()> {
	let input = r#"<img src="./a.png" class="hero enhanced-media wide">"#;
	let output = enhance_source(input, &EnhanceConfig::default())?;

	assert!(output.code.contains(r#"class="hero enhanced-media wide""#));

	let input = r#"<img src="./a.gif" class="hero">"#;
	let output = enhance_source(input, &EnhanceConfig::default())?;

	assert!(output.code.contains(r#"class="hero enhanced-media""#));

	Ok(())
}

#[test]
fn sizes_precedence() -> EnhanceResult<()> {
	let authored = enhance_source(
		r#"<img src="./a.png" sizes="50vw">"#,
		&EnhanceConfig::default(),
	)?;
	assert_eq!(authored.code.matches(r#"sizes="50vw""#).count(), 2);

	let dynamic = enhance_source(
		r#"<img src="./a.png" sizes={sizes}>"#,
		&EnhanceConfig::default(),
	)?;
	assert_eq!(dynamic.code.matches("sizes={sizes}").count(), 2);

	let config = EnhanceConfig {
		sizes: Some("100vw".into()),
		..EnhanceConfig::default()
	};
	let configured = enhance_source(r#"<img src="./a.png">"#, &config)?;
	assert_eq!(configured.code.matches(r#"sizes="100vw""#).count(), 2);

	let default = enhance_source(r#"<img src="./a.png">"#, &EnhanceConfig::default())?;
	assert_eq!(
		default
			.code
			.matches(r#"sizes="(min-width: 1280px) 1280px, 100vw""#)
			.count(),
		2
	);

	Ok(())
}

#[test]
fn priority_suppresses_lazy_loading() -> EnhanceResult<()> {
	let output = enhance_source(r#"<img src="./a.gif" priority>"#, &EnhanceConfig::default())?;
	assert!(output.code.ends_with(
		r#"<img src={__media_a_gif} class="enhanced-media" fetchpriority="high">"#
	));

	let output = enhance_source(
		r#"<img src="./a.png" fetchpriority="high">"#,
		&EnhanceConfig::default(),
	)?;
	assert!(!output.code.contains("loading="));
	assert!(!output.code.contains("decoding="));
	assert_eq!(output.code.matches("fetchpriority").count(), 1);

	let output = enhance_source(
		r#"<img src="./a.png" priority alt="hero">"#,
		&EnhanceConfig::default(),
	)?;
	assert!(!output.code.contains("priority "));
	assert!(output.code.contains(r#"fetchpriority="high""#));

	Ok(())
}

#[test]
fn video_gets_a_source_child() -> EnhanceResult<()> {
	let input = r#"<video src="./clip.mp4" autoplay muted alt="clip"><track kind="captions"></video>"#;
	let output = enhance_source(input, &EnhanceConfig::default())?;

	assert_eq!(specifiers(&output), vec!["./clip.mp4"]);
	assert!(output.plans[0].is_video());
	assert!(output.code.ends_with(
		r#"<video autoplay muted class="enhanced-media" controls><source src={__media_clip_mp4} type="video/mp4" /><track kind="captions"></video>"#
	));

	Ok(())
}

#[test]
fn self_closing_video_is_closed() -> EnhanceResult<()> {
	let input = r#"<video src="./clip.webm" controls />"#;
	let output = enhance_source(input, &EnhanceConfig::default())?;

	assert!(output.code.ends_with(
		r#"<video controls class="enhanced-media"><source src={__media_clip_webm} type="video/webm" /></video>"#
	));

	Ok(())
}

#[rstest]
#[case::inside_picture(r#"<picture><img src="./a.png"></picture>"#, SkipReason::InsideResponsiveContainer)]
#[case::dynamic(r"<img src={hero}>", SkipReason::DynamicSource)]
#[case::interpolated(r#"<img src="./{name}.png">"#, SkipReason::DynamicSource)]
#[case::missing("<img alt=\"none\">", SkipReason::MissingSource)]
#[case::empty(r#"<img src="">"#, SkipReason::EmptySource)]
#[case::video_as_image(r#"<img src="./clip.mp4">"#, SkipReason::MismatchedKind)]
#[case::image_as_video(r#"<video src="./a.png"></video>"#, SkipReason::MismatchedKind)]
fn skipped_elements(#[case] input: &str, #[case] reason: SkipReason) -> EnhanceResult<()> {
	let output = enhance_source(input, &EnhanceConfig::default())?;

	assert_eq!(output.code, input);
	assert_eq!(output.skipped.len(), 1);
	assert_eq!(output.skipped[0].reason, reason);

	Ok(())
}

#[test]
#[traced_test]
fn skipped_elements_are_logged() {
	let input = "<p>intro</p>\n<img src={hero}>";
	let output = enhance_source(input, &EnhanceConfig::default());
	let skipped = output.map(|output| output.skipped).unwrap_or_default();

	assert_eq!(skipped.len(), 1);
	assert_eq!(skipped[0].point.line, 2);
	assert_eq!(skipped[0].point.column, 1);
	assert!(logs_contain("skipping element"));
}

#[test]
fn skip_images_suffixes() -> EnhanceResult<()> {
	let config = EnhanceConfig {
		skip_images: vec![".placeholder.png".into()],
		..EnhanceConfig::default()
	};
	let input = r#"<img src="./hero.placeholder.png"><img src="./hero.png">"#;
	let output = enhance_source(input, &config)?;

	assert_eq!(output.skipped[0].reason, SkipReason::SkipPattern);
	assert!(output.code.contains(r#"<img src="./hero.placeholder.png">"#));
	assert_eq!(output.rewritten, 1);

	Ok(())
}

#[test]
fn metadata_can_be_disabled() -> EnhanceResult<()> {
	let config = EnhanceConfig {
		include_metadata: false,
		..EnhanceConfig::default()
	};
	let output = enhance_source(r#"<img src="./a.png">"#, &config)?;

	assert_eq!(output.imports.len(), 3);
	assert!(!output.plans[0].has_metadata());
	assert!(!output.code.contains("width="));

	Ok(())
}

#[test]
fn query_strings_reach_the_pipeline() -> EnhanceResult<()> {
	let output = enhance_source(r#"<img src="./a.png?v=2">"#, &EnhanceConfig::default())?;

	assert_eq!(
		specifiers(&output),
		vec![
			"./a.png?v=2",
			"./a.png?v=2&w=480;768;1024;1280&format=avif&as=srcset&withoutEnlargement",
			"./a.png?v=2&w=480;768;1024;1280&format=webp&as=srcset&withoutEnlargement",
			"./a.png?v=2&as=meta:width;height",
		]
	);

	Ok(())
}

#[test]
fn colliding_identifiers_get_a_counter() -> EnhanceResult<()> {
	let input = r#"<img src="./a-b.gif"><img src="./a_b.gif">"#;
	let output = enhance_source(input, &EnhanceConfig::default())?;

	assert_eq!(bindings(&output), vec!["__media_a_b_gif", "__media_a_b_gif_2"]);

	let input = "<script>\nimport __media_a_gif from './other.gif';\n</script>\n<img src=\"./a.gif\">";
	let output = enhance_source(input, &EnhanceConfig::default())?;

	assert_eq!(bindings(&output), vec!["__media_a_gif_2"]);

	Ok(())
}

#[test]
fn imports_append_after_the_last_import() -> EnhanceResult<()> {
	let input = "<script>\n\timport Foo from './Foo.svelte';\n\tlet x = 1;\n</script>\n\n<img \
	             src=\"./a.gif\">";
	let output = enhance_source(input, &EnhanceConfig::default())?;

	assert!(output.code.starts_with(
		"<script>\n\timport Foo from './Foo.svelte';\nimport __media_a_gif from \"./a.gif\";\n\tlet \
		 x = 1;\n</script>"
	));

	Ok(())
}

#[test]
fn imports_go_at_the_start_of_a_script_without_imports() -> EnhanceResult<()> {
	let input = "<script>\n\tlet x = 1;\n</script>\n<img src=\"./a.gif\">";
	let output = enhance_source(input, &EnhanceConfig::default())?;

	assert!(output.code.starts_with(
		"<script>\nimport __media_a_gif from \"./a.gif\";\n\tlet x = 1;\n</script>"
	));

	let input = "<script>let x = 1;</script><img src=\"./a.gif\">";
	let output = enhance_source(input, &EnhanceConfig::default())?;

	assert!(output.code.starts_with(
		"<script>\nimport __media_a_gif from \"./a.gif\";\nlet x = 1;</script>"
	));

	Ok(())
}

#[test]
fn imports_prefer_the_instance_script() -> EnhanceResult<()> {
	let input = "<script context=\"module\">\n\texport const prerender = true;\n</script>\n<script>\n\tlet \
	             x;\n</script>\n<img src=\"./a.gif\">";
	let output = enhance_source(input, &EnhanceConfig::default())?;

	assert!(output.code.contains(
		"<script>\nimport __media_a_gif from \"./a.gif\";\n\tlet x;\n</script>"
	));
	assert!(output.code.starts_with(
		"<script context=\"module\">\n\texport const prerender = true;\n</script>"
	));

	let input = "<script context=\"module\">\n\texport const prerender = true;\n</script>\n<img \
	             src=\"./a.gif\">";
	let output = enhance_source(input, &EnhanceConfig::default())?;

	assert!(output.code.starts_with(
		"<script context=\"module\">\nimport __media_a_gif from \"./a.gif\";\n\texport"
	));

	Ok(())
}

#[rstest]
#[case::data_script_in_head(
	r#"<svelte:head><script type="application/ld+json">{"a":1}</script></svelte:head><img src="./a.gif">"#,
	"<script>\nimport __media_a_gif from \"./a.gif\";\n</script>\n\n<svelte:head><script \
	 type=\"application/ld+json\">{\"a\":1}</script></svelte:head><img src={__media_a_gif} class=\"enhanced-media\" loading=\"lazy\" decoding=\"async\">"
)]
#[case::top_level_data_script(
	"<script type=\"application/ld+json\">{}</script>\n<img src=\"./a.gif\">",
	"<script>\nimport __media_a_gif from \"./a.gif\";\n</script>\n\n<script \
	 type=\"application/ld+json\">{}</script>\n<img src={__media_a_gif} class=\"enhanced-media\" loading=\"lazy\" decoding=\"async\">"
)]
#[case::instance_after_head_script(
	"<svelte:head><script src=\"/analytics.js\"></script></svelte:head>\n<script \
	 lang=\"ts\">\n\tlet x;\n</script>\n<img src=\"./a.gif\">",
	"<svelte:head><script src=\"/analytics.js\"></script></svelte:head>\n<script \
	 lang=\"ts\">\nimport __media_a_gif from \"./a.gif\";\n\tlet x;\n</script>\n<img src={__media_a_gif} class=\"enhanced-media\" loading=\"lazy\" decoding=\"async\">"
)]
fn imports_skip_nested_and_data_scripts(
	#[case] input: &str,
	#[case] expected: &str,
) -> EnhanceResult<()> {
	let output = enhance_source(input, &EnhanceConfig::default())?;
	assert_eq!(output.code, expected);

	Ok(())
}

#[rstest]
#[case::markdown(Syntax::Markdown)]
#[case::svelte(Syntax::Svelte)]
fn imports_follow_frontmatter(#[case] syntax: Syntax) -> EnhanceResult<()> {
	let input = "---\ntitle: Hi\n---\n\n<img src=\"./a.gif\">";
	let output = enhance_source_with(input, syntax, &EnhanceConfig::default())?;

	assert_eq!(
		output.code,
		"---\ntitle: Hi\n---\n\n<script>\nimport __media_a_gif from \"./a.gif\";\n</script>\n\n<img src={__media_a_gif} class=\"enhanced-media\" loading=\"lazy\" decoding=\"async\">"
	);

	Ok(())
}

#[rstest]
#[case::brace_in_code_span(Syntax::Markdown, "Use a `{` to open a block.\n\n<img src=\"./a.gif\">")]
#[case::brace_in_prose(
	Syntax::Markdown,
	"Use a { to open a block.\n\nClose it with }.\n\n<img src=\"./a.gif\">"
)]
#[case::brace_in_component(Syntax::Svelte, "<p>Use a { to open a block.</p>\n<img src=\"./a.gif\">")]
fn stray_braces_do_not_hide_media(#[case] syntax: Syntax, #[case] input: &str) -> EnhanceResult<()> {
	let output = enhance_source_with(input, syntax, &EnhanceConfig::default())?;

	assert_eq!(output.rewritten, 1);
	assert_eq!(bindings(&output), vec!["__media_a_gif"]);

	Ok(())
}

#[test]
fn markdown_code_is_left_alone() -> EnhanceResult<()> {
	let input = "```svelte\n<img src=\"./fenced.gif\">\n```\n\n~~~\n<img \
	             src=\"./tilde.gif\">\n~~~\n\nInline `<img src=\"./inline.gif\">` code.\n\n<img \
	             src=\"./a.gif\">\n";
	let output = enhance_source_with(input, Syntax::Markdown, &EnhanceConfig::default())?;

	assert_eq!(output.rewritten, 1);
	assert_eq!(specifiers(&output), vec!["./a.gif"]);
	assert!(output.code.contains("```svelte\n<img src=\"./fenced.gif\">\n```"));
	assert!(output.code.contains("~~~\n<img src=\"./tilde.gif\">\n~~~"));
	assert!(output.code.contains("`<img src=\"./inline.gif\">`"));

	let component = enhance_source_with(input, Syntax::Svelte, &EnhanceConfig::default())?;
	assert_eq!(component.rewritten, 4);

	Ok(())
}

#[rstest]
#[case::markdown("posts/a.md", Syntax::Markdown)]
#[case::mdsvex("posts/a.SVX", Syntax::Markdown)]
#[case::component("routes/+page.svelte", Syntax::Svelte)]
#[case::html("index.html", Syntax::Svelte)]
fn syntax_from_path(#[case] path: &str, #[case] expected: Syntax) {
	assert_eq!(Syntax::from_path(Path::new(path)), expected);
}

#[test]
fn documents_without_media_are_unchanged() -> EnhanceResult<()> {
	let input = "# Title\n\n<p class=\"intro\">Hello {name}</p>\n";
	let output = enhance_source(input, &EnhanceConfig::default())?;

	assert_eq!(output.code, input);
	assert!(!output.is_changed(input));
	assert!(output.imports.is_empty());

	Ok(())
}

#[test]
fn enhance_accepts_a_host_document() -> EnhanceResult<()> {
	let source = r#"<img src="./a.gif">"#;
	let document = Document {
		elements: vec![Element {
			name: "img".into(),
			span: Span::new(0, 19),
			open_tag: Span::new(0, 19),
			attributes_end: 18,
			self_closing: false,
			parent: None,
			attributes: vec![Attribute {
				name: "src".into(),
				span: Span::new(5, 18),
				value: AttributeValue::Static {
					text: "./a.gif".into(),
					span: Span::new(9, 18),
				},
			}],
		}],
		scripts: vec![],
		frontmatter: None,
	};
	let output = enhance(source, &document, &EnhanceConfig::default())?;

	assert!(output.code.ends_with(
		r#"<img src={__media_a_gif} class="enhanced-media" loading="lazy" decoding="async">"#
	));

	Ok(())
}

#[test]
fn config_from_toml_with_aliases() -> EnhanceResult<()> {
	let config = EnhanceConfig::from_toml(
		r#"
mainWidth = 900
widths = [320, 900]
skipImages = [".placeholder.png"]
includeMetadata = false
classes = ["a", "b"]

[project]
extensions = ["svelte"]
exclude = ["build/"]
"#,
	)?;

	assert_eq!(config.main_width, 900);
	assert_eq!(*config.width_set()?, vec![320, 900]);
	assert!(!config.include_metadata);
	assert!(config.include_srcset);
	assert_eq!(config.skip_images, vec![".placeholder.png"]);
	assert_eq!(config.classes, vec!["a", "b"]);
	assert_eq!(config.project.extensions, vec!["svelte"]);
	assert_eq!(config.default_sizes(), "(min-width: 900px) 900px, 100vw");

	Ok(())
}

#[rstest]
#[case::zero_width("widths = [0]")]
#[case::zero_main_width("main_width = 0")]
fn config_rejects_invalid_widths(#[case] content: &str) {
	assert!(matches!(
		EnhanceConfig::from_toml(content),
		Err(EnhanceError::InvalidWidth(0))
	));
}

#[test]
fn config_rejects_invalid_toml() {
	assert!(matches!(
		EnhanceConfig::from_toml("widths = [480"),
		Err(EnhanceError::ConfigParse(_))
	));
}

#[test]
fn config_discovery_order() -> EnhanceResult<()> {
	let tmp = tempfile::tempdir()?;
	let root = tmp.path();

	assert_eq!(EnhanceConfig::resolve_path(root), None);
	assert_eq!(EnhanceConfig::load_or_default(root)?, EnhanceConfig::default());

	std::fs::create_dir_all(root.join(".config"))?;
	std::fs::write(root.join(".config/enhance.toml"), "main_width = 600")?;
	assert_eq!(
		EnhanceConfig::resolve_path(root),
		Some(root.join(".config/enhance.toml"))
	);

	std::fs::write(root.join("enhance.toml"), "main_width = 700")?;
	let config = EnhanceConfig::load(root)?;
	assert_eq!(config.map(|config| config.main_width), Some(700));

	Ok(())
}

fn write_file(root: &Path, path: &str, content: &str) -> EnhanceResult<()> {
	let path = root.join(path);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(path, content)?;
	Ok(())
}

#[test]
fn collect_project_files() -> EnhanceResult<()> {
	let tmp = tempfile::tempdir()?;
	let root = tmp.path();

	write_file(root, "src/routes/+page.svelte", "")?;
	write_file(root, "src/posts/hello.svx", "")?;
	write_file(root, "README.md", "")?;
	write_file(root, "src/lib/util.ts", "")?;
	write_file(root, "node_modules/pkg/index.svelte", "")?;
	write_file(root, ".svelte-kit/output.svelte", "")?;
	write_file(root, "build/page.svelte", "")?;
	write_file(root, "generated/page.svelte", "")?;
	write_file(root, "nested/enhance.toml", "")?;
	write_file(root, "nested/page.svelte", "")?;
	write_file(root, ".gitignore", "build/\n")?;

	let project = ProjectConfig {
		exclude: vec!["generated/".into()],
		..ProjectConfig::default()
	};
	let files = collect_files(root, &project)?;
	let relative: Vec<String> = files
		.iter()
		.filter_map(|file| file.strip_prefix(root).ok())
		.map(|file| file.to_string_lossy().replace('\\', "/"))
		.collect();

	assert_eq!(
		relative,
		vec!["README.md", "src/posts/hello.svx", "src/routes/+page.svelte"]
	);

	let project = ProjectConfig {
		disable_gitignore: true,
		extensions: vec!["svelte".into()],
		..ProjectConfig::default()
	};
	let files = collect_files(root, &project)?;
	assert!(files.contains(&root.join("build/page.svelte")));
	assert!(!files.contains(&root.join("README.md")));

	Ok(())
}

#[test]
fn compute_and_write_project_updates() -> EnhanceResult<()> {
	let tmp = tempfile::tempdir()?;
	let root = tmp.path();

	write_file(root, "src/a.svelte", "<img src=\"./a.gif\">")?;
	write_file(root, "src/b.svelte", "<p>no media</p>")?;
	write_file(root, "src/broken.svelte", "<script>\nlet a;\n")?;

	let updates = compute_updates(root, &EnhanceConfig::default())?;

	assert_eq!(updates.reports.len(), 2);
	assert_eq!(updates.changed_count(), 1);
	assert_eq!(updates.rewritten_count(), 1);
	assert_eq!(updates.errors.len(), 1);
	assert!(updates.has_errors());
	assert!(!updates.is_ok());
	assert!(updates.errors[0].file.ends_with("broken.svelte"));

	write_updates(&updates)?;
	let content = std::fs::read_to_string(root.join("src/a.svelte"))?;
	assert!(content.starts_with("<script>\nimport __media_a_gif from \"./a.gif\";\n</script>\n\n"));

	let again = compute_updates(root, &EnhanceConfig::default())?;
	assert_eq!(again.changed_count(), 0);

	Ok(())
}

#[test]
fn unreadable_files_are_reported_per_file() -> EnhanceResult<()> {
	let tmp = tempfile::tempdir()?;
	let root = tmp.path();

	write_file(root, "a.svelte", "<img src=\"./a.gif\">")?;
	std::fs::write(root.join("b.md"), b"<p>caf\xE9</p>")?;
	write_file(root, "c.md", "```\n<img src=\"./x.gif\">\n```\n")?;

	let updates = compute_updates(root, &EnhanceConfig::default())?;

	assert_eq!(updates.reports.len(), 2);
	assert!(updates.reports[0].file.ends_with("a.svelte"));
	assert!(updates.reports[1].file.ends_with("c.md"));
	assert!(!updates.reports[1].changed);
	assert_eq!(updates.changed_count(), 1);
	assert_eq!(updates.errors.len(), 1);
	assert!(updates.errors[0].file.ends_with("b.md"));

	Ok(())
}

#[test]
fn output_serializes_for_reports() -> AnyEmptyResult {
	let output = enhance_source(
		r#"<img src={hero}><img src="./a.gif">"#,
		&EnhanceConfig::default(),
	)?;
	let value = serde_json::to_value(&output)?;

	assert_eq!(value["rewritten"], 1);
	assert_eq!(value["skipped"][0]["reason"], "dynamicSource");
	assert_eq!(value["skipped"][0]["point"]["column"], 1);
	assert_eq!(value["imports"][0]["binding"], "__media_a_gif");
	assert_eq!(value["plans"][0]["asset"]["kind"], "animatedRaster");

	Ok(())
}
